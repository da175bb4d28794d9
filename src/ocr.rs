use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cases::{case_id_from_filename, CaseTable};
use crate::db;
use crate::settings::OcrSettings;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("{0} not found (install poppler-utils / tesseract-ocr)")]
    ToolMissing(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("recognition failed on {page}: {message}")]
    Recognize { page: String, message: String },

    #[error("no pages rendered")]
    NoPages,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Anything that turns a PDF into ordered per-page text.
pub trait PageTextSource: Send + Sync {
    fn pages(&self, pdf: &Path) -> Result<Vec<String>, OcrError>;
}

/// `pdftoppm` renders every page to PNG, `tesseract` reads each one.
pub struct TesseractSource {
    settings: OcrSettings,
}

impl TesseractSource {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    fn render(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let output = Command::new(&self.settings.pdftoppm_cmd)
            .args(["-png", "-r", &self.settings.dpi.to_string()])
            .arg(pdf)
            .arg(out_dir.join("page"))
            .output()
            .map_err(|e| tool_error(&self.settings.pdftoppm_cmd, e))?;

        if !output.status.success() {
            return Err(OcrError::Render(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        // pdftoppm zero-pads page numbers to a common width, so name order is page order.
        let mut images: Vec<PathBuf> = fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e == "png"))
            .collect();
        images.sort();
        Ok(images)
    }

    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.settings.tesseract_cmd)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.settings.language])
            .output()
            .map_err(|e| tool_error(&self.settings.tesseract_cmd, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(OcrError::Recognize {
                page: image.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl PageTextSource for TesseractSource {
    fn pages(&self, pdf: &Path) -> Result<Vec<String>, OcrError> {
        let tmp = TempDir::new()?;
        let images = self.render(pdf, tmp.path())?;
        if images.is_empty() {
            return Err(OcrError::NoPages);
        }
        debug!("{}: {} page image(s)", pdf.display(), images.len());
        images.iter().map(|img| self.recognize(img)).collect()
    }
}

fn tool_error(cmd: &str, e: io::Error) -> OcrError {
    if e.kind() == io::ErrorKind::NotFound {
        OcrError::ToolMissing(cmd.to_string())
    } else {
        OcrError::Io(e)
    }
}

/// PDFs in `dir` keyed by case id, sorted. A second file for the same case
/// is skipped with a warning. A missing `dir` is created empty.
pub fn find_pdfs(dir: &Path) -> Result<CaseTable<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    paths.sort();

    let mut table = CaseTable::new();
    for path in paths {
        let Some(case_id) = case_id_from_filename(&path) else {
            continue;
        };
        if let Err(e) = table.insert(case_id, path.clone()) {
            warn!("{}: skipping {}", e, path.display());
        }
    }
    Ok(table)
}

pub struct OcrStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

struct OcrOutcome {
    case_id: String,
    source_file: String,
    pages: Result<Vec<String>, OcrError>,
}

/// OCR PDFs concurrently, saving each document to the store as it finishes.
/// A failed document is recorded with its error and never aborts the batch.
pub async fn ocr_documents_streaming(
    conn: &Connection,
    source: Arc<dyn PageTextSource>,
    jobs: Vec<(String, PathBuf)>,
    concurrency: usize,
) -> Result<OcrStats> {
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let total = jobs.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<OcrOutcome>(concurrency * 2);

    for (case_id, path) in jobs {
        let source = Arc::clone(&source);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire_owned().await else {
                return;
            };
            let source_file = path.display().to_string();
            let pages = match tokio::task::spawn_blocking(move || source.pages(&path)).await {
                Ok(pages) => pages,
                Err(e) => Err(OcrError::Io(io::Error::other(e.to_string()))),
            };
            let _ = tx
                .send(OcrOutcome {
                    case_id,
                    source_file,
                    pages,
                })
                .await;
        });
    }

    // rx closes once every task has dropped its sender
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some(outcome) = rx.recv().await {
        match &outcome.pages {
            Ok(pages) => {
                db::save_document(conn, &outcome.case_id, &outcome.source_file, pages)?;
                ok += 1;
            }
            Err(e) => {
                warn!("OCR failed for {}: {}", outcome.case_id, e);
                db::save_ocr_failure(conn, &outcome.case_id, &outcome.source_file, &e.to_string())?;
                errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("OCR'd {} documents ({} ok, {} errors)", total, ok, errors);

    Ok(OcrStats { total, ok, errors })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pages derived from the file name; `bad*` files fail.
    struct FakeSource;

    impl PageTextSource for FakeSource {
        fn pages(&self, pdf: &Path) -> Result<Vec<String>, OcrError> {
            let name = pdf.file_stem().unwrap().to_string_lossy().to_string();
            if name.starts_with("bad") {
                return Err(OcrError::NoPages);
            }
            Ok(vec![format!("CASE\nVS.\n{}\n", name.to_uppercase()), "page two".into()])
        }
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    #[tokio::test]
    async fn streams_results_and_failures_into_store() {
        let conn = memory_db();
        let jobs = vec![
            ("A1".to_string(), PathBuf::from("docs/alpha.pdf")),
            ("A2".to_string(), PathBuf::from("docs/bad_scan.pdf")),
            ("A3".to_string(), PathBuf::from("docs/gamma.pdf")),
        ];

        let stats = ocr_documents_streaming(&conn, Arc::new(FakeSource), jobs, 2)
            .await
            .unwrap();
        assert_eq!((stats.total, stats.ok, stats.errors), (3, 2, 1));

        let docs = db::fetch_documents(&conn, None, false).unwrap();
        let ids: Vec<_> = docs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["A1", "A3"]);
        assert_eq!(docs[0].1.page_count(), 2);

        let s = db::get_stats(&conn).unwrap();
        assert_eq!(s.ocr_failures, 1);
    }

    #[test]
    fn missing_tool_is_reported() {
        let source = TesseractSource::new(OcrSettings {
            tesseract_cmd: "no-such-tesseract-binary".into(),
            pdftoppm_cmd: "no-such-pdftoppm-binary".into(),
            dpi: 150,
            language: "eng".into(),
            concurrency: 1,
        });
        match source.pages(Path::new("missing.pdf")) {
            Err(OcrError::ToolMissing(cmd)) => assert_eq!(cmd, "no-such-pdftoppm-binary"),
            other => panic!("expected ToolMissing, got {:?}", other),
        }
    }

    #[test]
    fn missing_docs_dir_is_created() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("initial_docs");
        let table = find_pdfs(&dir).unwrap();
        assert_eq!(table.len(), 0);
        assert!(dir.is_dir());
    }

    #[test]
    fn finds_pdfs_by_case_id() {
        let dir = TempDir::new().unwrap();
        for name in [
            "A2304512_initial_filing.pdf",
            "A2304512_amended.pdf",
            "A2301877.pdf",
            "readme.txt",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let table = find_pdfs(dir.path()).unwrap();
        let ids: Vec<_> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["A2301877", "A2304512"]);
        // sorted names: "A2304512_amended" comes first and wins
        assert!(table.into_inner()["A2304512"].ends_with("A2304512_amended.pdf"));
    }
}
