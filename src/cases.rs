use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::extract::{ExtractionResult, Field};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaseTableError {
    #[error("case {0} already present")]
    DuplicateCase(String),
}

/// Case id → value, ordered by case id. Each case is written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseTable<T> {
    cases: BTreeMap<String, T>,
}

impl<T> Default for CaseTable<T> {
    fn default() -> Self {
        Self { cases: BTreeMap::new() }
    }
}

impl<T> CaseTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, case_id: impl Into<String>, value: T) -> Result<(), CaseTableError> {
        let case_id = case_id.into();
        if self.cases.contains_key(&case_id) {
            return Err(CaseTableError::DuplicateCase(case_id));
        }
        self.cases.insert(case_id, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.cases.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> BTreeMap<String, T> {
        self.cases
    }
}

impl<T: DeserializeOwned> CaseTable<T> {
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

impl<T: Serialize> CaseTable<T> {
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// Raw OCR pages per case, the format the `import` and `export --pages`
/// commands read and write.
pub type PageTable = CaseTable<Vec<String>>;

pub type ResultTable = CaseTable<ExtractionResult>;

impl ResultTable {
    /// One row per case: `case_id` then every field, empty cell for none.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;

        let mut header = vec!["case_id"];
        header.extend(Field::ALL.iter().map(|f| f.as_str()));
        wtr.write_record(&header)?;

        for (case_id, result) in self.iter() {
            let mut row = vec![case_id];
            row.extend(Field::ALL.iter().map(|f| result.get(*f).unwrap_or("")));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// `A2304512_initial_filing.pdf` → `A2304512`. Non-PDF files yield `None`.
pub fn case_id_from_filename(path: &Path) -> Option<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let id = stem.split('_').next().unwrap_or(stem);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
