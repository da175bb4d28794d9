pub mod chain;
pub mod document;
pub mod extract;

use rayon::prelude::*;

use document::Document;
use extract::ExtractionResult;

/// Run every field extractor over one OCR'd filing.
pub fn process_document(doc: &Document) -> ExtractionResult {
    extract::extract_all(doc)
}

/// Extract a batch of `(case_id, document)` pairs in parallel, keeping order.
pub fn extract_batch(docs: &[(String, Document)]) -> Vec<(String, ExtractionResult)> {
    docs.par_iter()
        .map(|(case_id, doc)| (case_id.clone(), process_document(doc)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_preserves_order() {
        let docs: Vec<(String, Document)> = (0..50)
            .map(|i| {
                let caption = format!("CASE\nVS.\nOWNER NUMBER {}\n", i);
                (format!("A{:07}", i), Document::new([caption]))
            })
            .collect();

        let out = extract_batch(&docs);
        assert_eq!(out.len(), 50);
        for (i, (case_id, r)) in out.iter().enumerate() {
            assert_eq!(case_id, &format!("A{:07}", i));
            assert_eq!(r.first_owner.as_deref(), Some(format!("OWNER NUMBER {}", i).as_str()));
        }
    }
}
