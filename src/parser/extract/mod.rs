pub mod interest;
pub mod mailing_address;
pub mod money;
pub mod owners;
pub mod property_address;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::document::{Document, Page};

/// Datapoints for one filing. Every field is best-effort; `None` means the
/// heuristics found nothing, not that the filing lacks the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub first_owner: Option<String>,
    pub second_owner: Option<String>,
    pub property_address: Option<String>,
    pub mailing_address: Option<String>,
    pub property_price: Option<String>,
    pub interest_rate: Option<String>,
    pub hoa_amount: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Field {
    FirstOwner,
    SecondOwner,
    PropertyAddress,
    MailingAddress,
    PropertyPrice,
    InterestRate,
    HoaAmount,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::FirstOwner,
        Field::SecondOwner,
        Field::PropertyAddress,
        Field::MailingAddress,
        Field::PropertyPrice,
        Field::InterestRate,
        Field::HoaAmount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::FirstOwner => "first_owner",
            Field::SecondOwner => "second_owner",
            Field::PropertyAddress => "property_address",
            Field::MailingAddress => "mailing_address",
            Field::PropertyPrice => "property_price",
            Field::InterestRate => "interest_rate",
            Field::HoaAmount => "hoa_amount",
        }
    }
}

impl ExtractionResult {
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::FirstOwner => &self.first_owner,
            Field::SecondOwner => &self.second_owner,
            Field::PropertyAddress => &self.property_address,
            Field::MailingAddress => &self.mailing_address,
            Field::PropertyPrice => &self.property_price,
            Field::InterestRate => &self.interest_rate,
            Field::HoaAmount => &self.hoa_amount,
        };
        value.as_deref()
    }

    pub fn filled(&self) -> usize {
        Field::ALL.iter().filter(|f| self.get(**f).is_some()).count()
    }
}

/// Run every field extractor against one document.
///
/// Owner and mailing fields read one named page; the rest read all pages
/// joined on [`super::document::PAGE_SEPARATOR`]. A missing page only blanks
/// the fields that need it.
pub fn extract_all(doc: &Document) -> ExtractionResult {
    let caption = select(doc, Page::Caption);
    let defendants = select(doc, Page::Defendants);
    let text = doc.joined();

    ExtractionResult {
        first_owner: caption.and_then(owners::first_owner),
        second_owner: defendants.and_then(owners::second_owner),
        property_address: property_address::extract(&text),
        mailing_address: defendants.and_then(mailing_address::extract),
        property_price: money::property_price(&text),
        interest_rate: interest::extract(&text),
        hoa_amount: money::hoa_amount(&text),
    }
}

fn select(doc: &Document, page: Page) -> Option<&str> {
    match doc.page(page) {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(?page, "{}", e);
            None
        }
    }
}

// ── Tests ──
