use std::path::PathBuf;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "foreclosure";
const ENV_PREFIX: &str = "FORECLOSURE";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub docs_dir: PathBuf,
    pub chunk_size: usize,
    pub ocr: OcrSettings,
}

/// External OCR tools and how hard to drive them.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrSettings {
    pub tesseract_cmd: String,
    pub pdftoppm_cmd: String,
    pub dpi: u32,
    pub language: String,
    pub concurrency: usize,
}

impl Settings {
    /// Defaults, then `foreclosure.toml` if present, then `FORECLOSURE_*`
    /// env vars (`FORECLOSURE_OCR__DPI=300`).
    pub fn load() -> Result<Self> {
        Self::builder()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("loading settings")?
            .try_deserialize()
            .context("invalid settings")
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("db_path", "data/foreclosures.sqlite")?
            .set_default("docs_dir", "initial_docs")?
            .set_default("chunk_size", 500)?
            .set_default("ocr.tesseract_cmd", "tesseract")?
            .set_default("ocr.pdftoppm_cmd", "pdftoppm")?
            .set_default("ocr.dpi", 150)?
            .set_default("ocr.language", "eng")?
            .set_default("ocr.concurrency", 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s: Settings = Settings::builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.db_path, PathBuf::from("data/foreclosures.sqlite"));
        assert_eq!(s.docs_dir, PathBuf::from("initial_docs"));
        assert_eq!(s.chunk_size, 500);
        assert_eq!(s.ocr.tesseract_cmd, "tesseract");
        assert_eq!(s.ocr.dpi, 150);
        assert_eq!(s.ocr.language, "eng");
        assert_eq!(s.ocr.concurrency, 4);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let s: Settings = Settings::builder()
            .unwrap()
            .add_source(config::File::from_str(
                "chunk_size = 50\n[ocr]\ndpi = 300\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.chunk_size, 50);
        assert_eq!(s.ocr.dpi, 300);
        assert_eq!(s.ocr.pdftoppm_cmd, "pdftoppm");
    }
}
