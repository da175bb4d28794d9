use thiserror::Error;

/// Separator used when a field reads the whole document as one text.
/// Several tiers anchor on `\n`, so pages are never glued on a space.
pub const PAGE_SEPARATOR: &str = "\n";

/// Named page positions in a foreclosure filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Petition page carrying the case caption (`... VS. <owner>`).
    Caption,
    /// Defendant listing with service addresses.
    Defendants,
}

impl Page {
    pub fn index(self) -> usize {
        match self {
            Page::Caption => 0,
            Page::Defendants => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("page {requested} requested but document has {available} page(s)")]
pub struct MissingPage {
    pub requested: usize,
    pub available: usize,
}

/// OCR text of one filing, one entry per page, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pages: Vec<String>,
}

impl Document {
    pub fn new<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pages = pages
            .into_iter()
            .map(|p| p.as_ref().replace("\r\n", "\n"))
            .collect();
        Document { pages }
    }

    pub fn page(&self, page: Page) -> Result<&str, MissingPage> {
        self.pages
            .get(page.index())
            .map(String::as_str)
            .ok_or(MissingPage {
                requested: page.index(),
                available: self.pages.len(),
            })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn joined(&self) -> String {
        self.pages.join(PAGE_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_normalized() {
        let doc = Document::new(["VS.\r\nJOHN SMITH\r\n"]);
        assert_eq!(doc.page(Page::Caption).unwrap(), "VS.\nJOHN SMITH\n");
    }

    #[test]
    fn missing_defendants_page() {
        let doc = Document::new(["only caption"]);
        assert_eq!(
            doc.page(Page::Defendants),
            Err(MissingPage {
                requested: 1,
                available: 1
            })
        );
    }

    #[test]
    fn joined_keeps_page_boundaries_on_newline() {
        let doc = Document::new(["a", "b", "c"]);
        assert_eq!(doc.joined(), "a\nb\nc");
        assert_eq!(Document::new(Vec::<String>::new()).joined(), "");
    }
}
