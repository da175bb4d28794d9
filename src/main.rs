mod cases;
mod db;
mod ocr;
mod parser;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;

use cases::PageTable;
use parser::document::Document;
use parser::extract::Field;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "foreclosure_extractor",
    about = "Extract owner, address and loan datapoints from OCR'd foreclosure filings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// OCR PDFs not yet in the store
    Ocr {
        /// Directory of case PDFs (default: docs_dir setting)
        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
        /// Max documents to OCR
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Load a case → pages JSON file into the store
    Import {
        path: PathBuf,
    },
    /// Extract datapoints from stored documents
    Extract {
        /// Max documents to extract
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Re-extract documents that already have a record
        #[arg(long)]
        all: bool,
    },
    /// OCR + extract in one pipeline
    Run {
        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
    },
    /// Write results (JSON and/or CSV) or the raw case → pages table
    Export {
        #[arg(long)]
        json: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        pages: Option<PathBuf>,
    },
    /// Show store statistics and per-field coverage
    Stats,
    /// Extracted records table
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Only cases where this field was not found
        #[arg(long, value_enum)]
        missing: Option<Field>,
    },
    /// Print one case's record as JSON
    Show {
        case_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(db = %settings.db_path.display(), "settings loaded");

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Ocr { dir, limit } => {
            let dir = dir.unwrap_or_else(|| settings.docs_dir.clone());
            run_ocr(&conn, &settings, dir, limit).await
        }
        Commands::Import { path } => {
            let table = PageTable::load_json(&path)?;
            let source = path.display().to_string();
            let inserted = db::import_pages(&conn, &table, &source)?;
            println!(
                "Imported {} new cases ({} in file, {} already stored).",
                inserted,
                table.len(),
                table.len() - inserted
            );
            Ok(())
        }
        Commands::Extract { limit, all } => {
            let docs = db::fetch_documents(&conn, limit, all)?;
            if docs.is_empty() {
                println!("No documents to extract. Run 'ocr' or 'import' first.");
                return Ok(());
            }
            println!("Extracting {} documents...", docs.len());
            let counts = process_documents(&conn, &docs, settings.chunk_size)?;
            counts.print();
            Ok(())
        }
        Commands::Run { dir } => {
            let dir = dir.unwrap_or_else(|| settings.docs_dir.clone());

            // Phase 1: OCR (streaming to DB)
            let t_ocr = Instant::now();
            run_ocr(&conn, &settings, dir, None).await?;
            println!("OCR phase took {}", format_duration(t_ocr.elapsed()));

            // Phase 2: Extract
            let t_extract = Instant::now();
            let docs = db::fetch_documents(&conn, None, false)?;
            if docs.is_empty() {
                println!("Nothing to extract.");
                return Ok(());
            }
            println!("Extracting {} documents...", docs.len());
            let counts = process_documents(&conn, &docs, settings.chunk_size)?;
            println!(
                "Extracted in {:.1}s",
                t_extract.elapsed().as_secs_f64()
            );
            counts.print();
            Ok(())
        }
        Commands::Export { json, csv, pages } => {
            if json.is_none() && csv.is_none() && pages.is_none() {
                anyhow::bail!("nothing to export: pass --json, --csv and/or --pages");
            }
            if json.is_some() || csv.is_some() {
                let results = db::fetch_results(&conn)?;
                if let Some(path) = json {
                    results.save_json(&path)?;
                    println!("Wrote {} records to {}", results.len(), path.display());
                }
                if let Some(path) = csv {
                    results.write_csv(&path)?;
                    println!("Wrote {} rows to {}", results.len(), path.display());
                }
            }
            if let Some(path) = pages {
                let table = db::fetch_pages(&conn)?;
                table.save_json(&path)?;
                println!("Wrote pages for {} cases to {}", table.len(), path.display());
            }
            Ok(())
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Documents:    {}", s.documents);
            println!("OCR failures: {}", s.ocr_failures);
            println!("Pages:        {}", s.pages);
            println!("Extracted:    {}", s.extracted);
            println!("Pending:      {}", s.pending);
            if s.extracted > 0 {
                println!("\n--- Coverage ---");
                for (field, n) in &s.coverage {
                    println!(
                        "  {:<17} {:>6} ({:.1}%)",
                        field.as_str(),
                        n,
                        *n as f64 * 100.0 / s.extracted as f64
                    );
                }
            }
            Ok(())
        }
        Commands::Overview { limit, missing } => {
            let rows = db::fetch_overview(&conn, missing, limit)?;
            if rows.is_empty() {
                println!("No records found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<10} | {:<22} | {:<22} | {:<30} | {:>13} | {:>7} | {:>10}",
                "#", "Case", "Owner", "Co-owner", "Property", "Price", "Rate", "HOA"
            );
            println!("{}", "-".repeat(137));

            for (i, (case_id, r)) in rows.iter().enumerate() {
                let cell = |v: &Option<String>, max: usize| {
                    v.as_deref().map(|s| truncate(s, max)).unwrap_or_else(|| "-".into())
                };
                println!(
                    "{:>3} | {:<10} | {:<22} | {:<22} | {:<30} | {:>13} | {:>7} | {:>10}",
                    i + 1,
                    case_id,
                    cell(&r.first_owner, 19),
                    cell(&r.second_owner, 19),
                    cell(&r.property_address, 27),
                    cell(&r.property_price, 13),
                    cell(&r.interest_rate, 7),
                    cell(&r.hoa_amount, 10),
                );
            }

            let filter = missing
                .map(|f| format!(" missing {}", f.as_str()))
                .unwrap_or_default();
            println!("\n{} cases{} | details: show <case_id>", rows.len(), filter);
            Ok(())
        }
        Commands::Show { case_id } => {
            let record = db::fetch_one(&conn, &case_id)?
                .with_context(|| format!("no record for case {}", case_id))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_ocr(
    conn: &Connection,
    settings: &Settings,
    dir: PathBuf,
    limit: Option<usize>,
) -> Result<()> {
    let existing = db::existing_case_ids(conn)?;
    let mut jobs: Vec<(String, PathBuf)> = ocr::find_pdfs(&dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .into_inner()
        .into_iter()
        .filter(|(case_id, _)| !existing.contains(case_id))
        .collect();
    if let Some(n) = limit {
        jobs.truncate(n);
    }
    if jobs.is_empty() {
        println!("No new PDFs in {}.", dir.display());
        return Ok(());
    }

    println!("OCR: {} documents (streaming to DB)...", jobs.len());
    let source = Arc::new(ocr::TesseractSource::new(settings.ocr.clone()));
    let stats =
        ocr::ocr_documents_streaming(conn, source, jobs, settings.ocr.concurrency).await?;
    println!(
        "Done: {} documents ({} ok, {} errors).",
        stats.total, stats.ok, stats.errors
    );
    Ok(())
}

struct ExtractCounts {
    documents: usize,
    pages: usize,
    fields: usize,
    empty: usize,
}

impl ExtractCounts {
    fn print(&self) {
        println!(
            "Saved {} records from {} pages: {} fields found, {} records with nothing found.",
            self.documents, self.pages, self.fields, self.empty,
        );
    }
}

fn process_documents(
    conn: &Connection,
    docs: &[(String, Document)],
    chunk_size: usize,
) -> Result<ExtractCounts> {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ExtractCounts {
        documents: 0,
        pages: 0,
        fields: 0,
        empty: 0,
    };

    for chunk in docs.chunks(chunk_size.max(1)) {
        let results = parser::extract_batch(chunk);
        counts.pages += chunk.iter().map(|(_, doc)| doc.page_count()).sum::<usize>();

        for (_, r) in &results {
            let filled = r.filled();
            counts.fields += filled;
            if filled == 0 {
                counts.empty += 1;
            }
        }

        counts.documents += db::save_extractions(conn, &results)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
