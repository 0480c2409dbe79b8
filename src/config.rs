//! Ingestion configuration.
//!
//! Handles loading, validating, and merging `ingest.toml`. Stock defaults
//! describe the site layout the ingester has always written to; a project only
//! needs a config file to override part of it.
//!
//! ## Config File Location
//!
//! `ingest.toml` in the project root (or any file passed with `--config`).
//! A missing file means "stock defaults".
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! default_book = "book-1"            # Used when --book is omitted
//!
//! [paths]                            # Relative to the project root
//! chapters_dir = "src/content/chapters"
//! books_dir = "src/content/books"
//! manifests_dir = "content/manifests"
//! public_images_dir = "public/images"
//! preview_images_dir = "images"      # Mirror of public images for local preview
//! web_root = "/images"               # URL prefix of public_images_dir
//!
//! [converter]
//! program = "pandoc"
//! format = "gfm"
//!
//! [books]
//! title_template = "全中国最激烈故事 {book_id}"
//!
//! [books.titles]
//! "book-1" = "全中国最激烈故事 第一部"
//! ```
//!
//! ## Partial Configuration
//!
//! A project file only lists what differs from the stock layout:
//!
//! ```toml
//! [converter]
//! program = "/opt/pandoc/bin/pandoc"
//! ```
//!
//! Unknown keys are rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name in the project root.
pub const CONFIG_FILENAME: &str = "ingest.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Ingestion configuration loaded from `ingest.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Book id used when the CLI does not name one.
    pub default_book: String,
    /// Output layout of the site project.
    pub paths: PathsConfig,
    /// External document converter.
    pub converter: ConverterConfig,
    /// Book metadata written alongside chapters.
    pub books: BooksConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_book: "book-1".to_string(),
            paths: PathsConfig::default(),
            converter: ConverterConfig::default(),
            books: BooksConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_book.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default_book must not be empty".into(),
            ));
        }
        if !self.paths.web_root.starts_with('/') {
            return Err(ConfigError::Validation(
                "paths.web_root must start with '/'".into(),
            ));
        }
        if self.converter.program.trim().is_empty() || self.converter.format.trim().is_empty() {
            return Err(ConfigError::Validation(
                "converter.program and converter.format must not be empty".into(),
            ));
        }
        if self.books.title_template.trim().is_empty() {
            return Err(ConfigError::Validation(
                "books.title_template must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Site project layout, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Chapter markdown files, one subdirectory per book.
    pub chapters_dir: String,
    /// Book metadata files.
    pub books_dir: String,
    /// Per-book JSON manifests.
    pub manifests_dir: String,
    /// Served media, `<book>/<chapter>/<file>`.
    pub public_images_dir: String,
    /// Local preview mirror of `public_images_dir`.
    pub preview_images_dir: String,
    /// URL prefix under which `public_images_dir` is served.
    pub web_root: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            chapters_dir: "src/content/chapters".to_string(),
            books_dir: "src/content/books".to_string(),
            manifests_dir: "content/manifests".to_string(),
            public_images_dir: "public/images".to_string(),
            preview_images_dir: "images".to_string(),
            web_root: "/images".to_string(),
        }
    }
}

/// External converter invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Executable name or path.
    pub program: String,
    /// Markdown flavour passed as `-t`.
    pub format: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "pandoc".to_string(),
            format: "gfm".to_string(),
        }
    }
}

/// Book titles for the generated book metadata files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BooksConfig {
    /// Title for books without an explicit entry; `{book_id}` is substituted.
    pub title_template: String,
    /// Explicit titles by book id.
    pub titles: BTreeMap<String, String>,
}

impl Default for BooksConfig {
    fn default() -> Self {
        Self {
            title_template: "全中国最激烈故事 {book_id}".to_string(),
            titles: BTreeMap::from([(
                "book-1".to_string(),
                "全中国最激烈故事 第一部".to_string(),
            )]),
        }
    }
}

impl BooksConfig {
    /// Display title for a book.
    pub fn title_for(&self, book_id: &str) -> String {
        match self.titles.get(book_id) {
            Some(title) => title.clone(),
            None => self.title_template.replace("{book_id}", book_id),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(IngestConfig::default()).expect("default config must serialize")
}

/// Deep-merge `overlay` over `base`: tables merge per key, anything else in
/// `overlay` replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value, `None` when it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load `path` over the stock defaults and validate the result.
pub fn load_config(path: &Path) -> Result<IngestConfig, ConfigError> {
    let merged = match load_raw_config(path)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: IngestConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `ingest.toml`.
///
/// Used by `--gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Novel Ingest Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Book id used when --book is not given.
default_book = "book-1"

# ---------------------------------------------------------------------------
# Site layout (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
# Chapter markdown files: <chapters_dir>/<book>/<chapter_id>.md
chapters_dir = "src/content/chapters"

# Book metadata files: <books_dir>/<book>.md
books_dir = "src/content/books"

# Chapter manifests: <manifests_dir>/<book>.json
manifests_dir = "content/manifests"

# Served chapter media: <public_images_dir>/<book>/<chapter_id>/<file>
public_images_dir = "public/images"

# Mirror of public_images_dir for previewing markdown in the workspace.
preview_images_dir = "images"

# URL prefix that serves public_images_dir. Must start with '/'.
web_root = "/images"

# ---------------------------------------------------------------------------
# Document converter
# ---------------------------------------------------------------------------
[converter]
# Executable used to turn .docx into markdown + extracted media.
program = "pandoc"

# Markdown flavour written by the converter.
format = "gfm"

# ---------------------------------------------------------------------------
# Book metadata
# ---------------------------------------------------------------------------
[books]
# Title for books without an entry below. {book_id} is replaced.
title_template = "全中国最激烈故事 {book_id}"

[books.titles]
"book-1" = "全中国最激烈故事 第一部"
"##
}
