//! Word-processor document conversion.
//!
//! The [`DocumentConverter`] trait is the seam between ingestion and the
//! external converter. A conversion writes `<out_dir>/document.md` plus any
//! embedded images under `<out_dir>/media/`, which is the layout the
//! [`media`](crate::media) resolver expects.
//!
//! The production implementation is [`PandocConverter`], which shells out to
//! `pandoc` as a blocking subprocess. Tests substitute a converter that writes
//! fixture markdown directly.

use crate::config::ConverterConfig;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Markdown file name inside the conversion output directory.
pub const MARKDOWN_FILENAME: &str = "document.md";

/// Directory (under the conversion output directory) holding extracted media.
pub const MEDIA_DIRNAME: &str = "media";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Document conversion with {program} failed.\n{output}")]
    Failed { program: String, output: String },
}

/// Converts a source document into markdown plus extracted media.
pub trait DocumentConverter {
    /// Convert `source` into `out_dir`, returning the markdown path.
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError>;
}

/// `pandoc <source> -t <format> --extract-media <out_dir> -o <out_dir>/document.md`
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: String,
    format: String,
}

impl PandocConverter {
    pub fn new(program: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            format: format.into(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(&config.program, &config.format)
    }
}

impl DocumentConverter for PandocConverter {
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let markdown_path = out_dir.join(MARKDOWN_FILENAME);
        let output = Command::new(&self.program)
            .arg(source)
            .args(["-t", self.format.as_str()])
            .arg("--extract-media")
            .arg(out_dir)
            .arg("-o")
            .arg(&markdown_path)
            .output()
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let details = format!("{}\n{}", stderr.trim(), stdout.trim());
            return Err(ConvertError::Failed {
                program: self.program.clone(),
                output: details.trim().to_string(),
            });
        }

        Ok(markdown_path)
    }
}
