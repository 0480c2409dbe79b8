use clap::Parser;
use novel_ingest::config::{self, CONFIG_FILENAME};
use novel_ingest::convert::PandocConverter;
use novel_ingest::ingest::{IngestMode, IngestRequest, Ingestor, parse_order};
use novel_ingest::output;
use std::path::{self, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "novel-ingest")]
#[command(about = "Ingest word-processor manuscripts into web-novel chapter content")]
#[command(long_about = "\
Ingest word-processor manuscripts into web-novel chapter content

A .docx is converted with pandoc, split into chapters on act headings
(开幕：…, 第二幕：…), and written as markdown with frontmatter. Chapter ids
are kept stable across re-ingestions by position.

Project layout (defaults, relative to --root):

  ingest.toml                          # Optional config overrides
  content/manifests/<book>.json        # Chapter manifest
  src/content/chapters/<book>/<id>.md  # Chapter files
  src/content/books/<book>.md          # Book metadata
  public/images/<book>/<id>/           # Chapter images (served at /images)
  images/<book>/                       # Preview mirror of public images

Modes:
  full     Whole manuscript; chapters matched to existing ids by position,
           trailing chapters that disappeared are archived.
  chapter  One chapter; updates the id given by --chapter-id or found in
           the file name (chapter-b1-c013.docx), otherwise adds a new one.

Run 'novel-ingest --gen-config' to generate a documented ingest.toml.")]
#[command(version)]
struct Cli {
    /// Ingestion mode: full | chapter
    #[arg(long)]
    mode: Option<String>,

    /// Word document to ingest
    #[arg(long = "file", value_name = "PATH")]
    file: Option<PathBuf>,

    /// Word document to ingest (same as --file)
    #[arg(value_name = "FILE", conflicts_with = "file")]
    positional_file: Option<PathBuf>,

    /// Book id (defaults to `default_book` from the config)
    #[arg(long)]
    book: Option<String>,

    /// Full mode: ignore the existing manifest and renumber from c001
    #[arg(long)]
    reset: bool,

    /// Chapter mode: id of the chapter to create or update
    #[arg(long)]
    chapter_id: Option<String>,

    /// Chapter mode: position of a new chapter (leading digits are read, negatives go first, no digits appends)
    #[arg(long)]
    order: Option<String>,

    /// Project root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to <root>/ingest.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a stock ingest.toml with all options documented
    #[arg(long)]
    gen_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mode: IngestMode = cli
        .mode
        .as_deref()
        .ok_or("Missing --mode full|chapter")?
        .parse()
        .map_err(|_| "Missing --mode full|chapter")?;
    let file = cli
        .file
        .or(cli.positional_file)
        .ok_or("Missing --file path-to-docx")?;

    let root = path::absolute(&cli.root)?;
    let config_path = cli.config.unwrap_or_else(|| root.join(CONFIG_FILENAME));
    let config = config::load_config(&config_path)?;

    let request = IngestRequest {
        mode,
        input_file: path::absolute(&file)?,
        book_id: cli.book.unwrap_or_else(|| config.default_book.clone()),
        reset: cli.reset,
        chapter_id: cli.chapter_id,
        order: cli.order.as_deref().and_then(parse_order),
    };

    let converter = PandocConverter::from_config(&config.converter);
    let report = Ingestor::new(&root, &config, &converter).run(&request)?;
    output::print_ingest_report(&report);
    Ok(())
}
