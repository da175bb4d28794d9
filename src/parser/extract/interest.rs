use std::sync::LazyLock;

use regex::Regex;

use crate::parser::chain::{run_chain, Step, Tier};

static DECIMAL_PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\.\d+%").unwrap());
static INTEREST_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"interest\s+\D*\s*(\d+%)").unwrap());
static PRINCIPAL_PAID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Principal\s+has\s+been\s+paid[^\d]*(\d{1,2}\.\d+)\s*%").unwrap()
});

pub const TIERS: &[Tier] = &[
    Tier { name: "decimal_percent", run: decimal_percent },
    Tier { name: "interest_word", run: interest_word },
    Tier { name: "principal_paid", run: principal_paid },
];

pub fn extract(text: &str) -> Option<String> {
    run_chain("interest_rate", TIERS, text)
}

pub fn decimal_percent(text: &str) -> Step {
    DECIMAL_PERCENT_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .into()
}

/// Whole-number rate after the word "interest", e.g. "interest at 8%".
pub fn interest_word(text: &str) -> Step {
    INTEREST_WORD_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .into()
}

/// Note clause "until ... Principal has been paid ... at a yearly rate of
/// 6.5 %" where OCR split the number from its percent sign.
pub fn principal_paid(text: &str) -> Step {
    PRINCIPAL_PAID_RE
        .captures(text)
        .map(|c| format!("{}%", &c[1]))
        .into()
}
