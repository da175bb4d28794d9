use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::cases::{PageTable, ResultTable};
use crate::parser::document::Document;
use crate::parser::extract::{ExtractionResult, Field};

const RESULT_COLUMNS: &str = "first_owner, second_owner, property_address, mailing_address, \
                              property_price, interest_rate, hoa_amount";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let conn = Connection::open(path).with_context(|| format!("opening {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            case_id     TEXT PRIMARY KEY,
            source_file TEXT NOT NULL,
            page_count  INTEGER NOT NULL DEFAULT 0,
            ocr_error   TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS pages (
            case_id  TEXT NOT NULL REFERENCES documents(case_id) ON DELETE CASCADE,
            page_no  INTEGER NOT NULL,
            text     TEXT NOT NULL,
            PRIMARY KEY (case_id, page_no)
        );

        CREATE TABLE IF NOT EXISTS extractions (
            case_id          TEXT PRIMARY KEY REFERENCES documents(case_id) ON DELETE CASCADE,
            first_owner      TEXT,
            second_owner     TEXT,
            property_address TEXT,
            mailing_address  TEXT,
            property_price   TEXT,
            interest_rate    TEXT,
            hoa_amount       TEXT,
            extracted_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Documents ──

/// Cases with stored pages. Failed OCR is left out so the next run retries it.
pub fn existing_case_ids(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT case_id FROM documents WHERE ocr_error IS NULL")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(ids)
}

/// Store OCR output for one case, replacing any earlier attempt.
pub fn save_document(
    conn: &Connection,
    case_id: &str,
    source_file: &str,
    pages: &[String],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM documents WHERE case_id = ?1", params![case_id])?;
    tx.execute(
        "INSERT INTO documents (case_id, source_file, page_count) VALUES (?1, ?2, ?3)",
        params![case_id, source_file, pages.len()],
    )?;
    {
        let mut stmt =
            tx.prepare("INSERT INTO pages (case_id, page_no, text) VALUES (?1, ?2, ?3)")?;
        for (page_no, text) in pages.iter().enumerate() {
            stmt.execute(params![case_id, page_no, text])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Record a document whose OCR failed. It is not extracted and is retried
/// on the next OCR run.
pub fn save_ocr_failure(
    conn: &Connection,
    case_id: &str,
    source_file: &str,
    error: &str,
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM documents WHERE case_id = ?1", params![case_id])?;
    tx.execute(
        "INSERT INTO documents (case_id, source_file, page_count, ocr_error) VALUES (?1, ?2, 0, ?3)",
        params![case_id, source_file, error],
    )?;
    tx.commit()?;
    Ok(())
}

/// Import a case → pages table. Cases already in the store are skipped.
pub fn import_pages(conn: &Connection, table: &PageTable, source_file: &str) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut doc_stmt = tx.prepare(
            "INSERT OR IGNORE INTO documents (case_id, source_file, page_count) VALUES (?1, ?2, ?3)",
        )?;
        let mut page_stmt =
            tx.prepare("INSERT INTO pages (case_id, page_no, text) VALUES (?1, ?2, ?3)")?;
        for (case_id, pages) in table.iter() {
            if doc_stmt.execute(params![case_id, source_file, pages.len()])? == 0 {
                continue;
            }
            for (page_no, text) in pages.iter().enumerate() {
                page_stmt.execute(params![case_id, page_no, text.replace("\r\n", "\n")])?;
            }
            count += 1;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// OCR'd documents waiting for extraction (or all of them with `all`).
/// Failed OCR rows are never returned.
pub fn fetch_documents(
    conn: &Connection,
    limit: Option<usize>,
    all: bool,
) -> Result<Vec<(String, Document)>> {
    let filter = if all {
        ""
    } else {
        "AND NOT EXISTS (SELECT 1 FROM extractions e WHERE e.case_id = d.case_id)"
    };
    let mut sql = format!(
        "SELECT d.case_id FROM documents d WHERE d.ocr_error IS NULL {} ORDER BY d.case_id",
        filter
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }

    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut page_stmt =
        conn.prepare("SELECT text FROM pages WHERE case_id = ?1 ORDER BY page_no")?;
    let mut docs = Vec::with_capacity(ids.len());
    for case_id in ids {
        let pages = page_stmt
            .query_map(params![case_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        docs.push((case_id, Document::new(pages)));
    }
    Ok(docs)
}

pub fn fetch_pages(conn: &Connection) -> Result<PageTable> {
    let mut stmt = conn.prepare(
        "SELECT d.case_id, p.text FROM documents d
         LEFT JOIN pages p ON p.case_id = d.case_id
         WHERE d.ocr_error IS NULL
         ORDER BY d.case_id, p.page_no",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut table = PageTable::new();
    let mut current: Option<(String, Vec<String>)> = None;
    for (case_id, text) in rows {
        match current.as_mut() {
            Some((id, pages)) if *id == case_id => pages.extend(text),
            _ => {
                if let Some((id, pages)) = current.take() {
                    table.insert(id, pages)?;
                }
                current = Some((case_id, text.into_iter().collect()));
            }
        }
    }
    if let Some((id, pages)) = current {
        table.insert(id, pages)?;
    }
    Ok(table)
}

// ── Extractions ──

/// Save one chunk of results in a single transaction. Re-extraction
/// replaces the earlier row.
pub fn save_extractions(conn: &Connection, rows: &[(String, ExtractionResult)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT OR REPLACE INTO extractions (case_id, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            RESULT_COLUMNS
        ))?;
        for (case_id, r) in rows {
            stmt.execute(params![
                case_id,
                r.first_owner,
                r.second_owner,
                r.property_address,
                r.mailing_address,
                r.property_price,
                r.interest_rate,
                r.hoa_amount,
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

fn result_from_row(row: &Row, offset: usize) -> rusqlite::Result<ExtractionResult> {
    Ok(ExtractionResult {
        first_owner: row.get(offset)?,
        second_owner: row.get(offset + 1)?,
        property_address: row.get(offset + 2)?,
        mailing_address: row.get(offset + 3)?,
        property_price: row.get(offset + 4)?,
        interest_rate: row.get(offset + 5)?,
        hoa_amount: row.get(offset + 6)?,
    })
}

pub fn fetch_results(conn: &Connection) -> Result<ResultTable> {
    let mut stmt = conn.prepare(&format!(
        "SELECT case_id, {} FROM extractions ORDER BY case_id",
        RESULT_COLUMNS
    ))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, result_from_row(row, 1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut table = ResultTable::new();
    for (case_id, result) in rows {
        table.insert(case_id, result)?;
    }
    Ok(table)
}

pub fn fetch_one(conn: &Connection, case_id: &str) -> Result<Option<ExtractionResult>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM extractions WHERE case_id = ?1", RESULT_COLUMNS),
            params![case_id],
            |row| result_from_row(row, 0),
        )
        .optional()?;
    Ok(row)
}

// ── Overview ──

pub fn fetch_overview(
    conn: &Connection,
    missing: Option<Field>,
    limit: usize,
) -> Result<Vec<(String, ExtractionResult)>> {
    let filter = match missing {
        Some(field) => format!("WHERE {} IS NULL", field.as_str()),
        None => String::new(),
    };
    let sql = format!(
        "SELECT case_id, {} FROM extractions {} ORDER BY case_id LIMIT {}",
        RESULT_COLUMNS, filter, limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, result_from_row(row, 1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct Stats {
    pub documents: usize,
    pub ocr_failures: usize,
    pub pages: usize,
    pub extracted: usize,
    pub pending: usize,
    pub coverage: Vec<(Field, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let documents: usize = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
    let ocr_failures: usize = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE ocr_error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let pages: usize = conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
    let extracted: usize =
        conn.query_row("SELECT COUNT(*) FROM extractions", [], |r| r.get(0))?;

    let mut coverage = Vec::with_capacity(Field::ALL.len());
    for field in Field::ALL {
        let n: usize = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM extractions WHERE {} IS NOT NULL",
                field.as_str()
            ),
            [],
            |r| r.get(0),
        )?;
        coverage.push((field, n));
    }

    Ok(Stats {
        documents,
        ocr_failures,
        pages,
        extracted,
        pending: (documents - ocr_failures).saturating_sub(extracted),
        coverage,
    })
}
