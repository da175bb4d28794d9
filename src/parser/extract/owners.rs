use std::sync::LazyLock;

use regex::Regex;

use crate::parser::chain::{run_chain, starts_with_any, Step, Tier};

static CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)VS\.\n(.*)").unwrap());

// \b keeps "THEIR" out; "HEIRS" is not matched.
static NO_SECOND_OWNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(JOHN DOE|JANE DOE|HEIR|UNKNOWN SPOUSE)\b").unwrap()
});
static NAME_AFTER_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\d{5}(?:-\d{4})?.*\n){1,2}([A-Z\s]+)\n\d+").unwrap()
});
static AFTER_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{5}\n\n(.*?)\n+\d{4,5}\s").unwrap());
static AFTER_AND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"and\n([A-Za-z\s]+)\n\d{4,5}\s").unwrap());
static AFTER_AND_BLANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"and\n\n([A-Za-z\s]+)\n\d{4,5}\s").unwrap());
static AFTER_ZIP_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{5}\n\n([\s\S]*?)\n+\d{4,5}\s").unwrap());

/// Boilerplate that the loose fallbacks tend to capture instead of a name.
pub const SECOND_OWNER_REJECT: &[&str] = &[
    "also serve at:",
    "united states",
    "plaintiff",
    "in the court of common",
];

pub const FIRST_OWNER_TIERS: &[Tier] = &[Tier {
    name: "caption_marker",
    run: caption_marker,
}];

pub const SECOND_OWNER_TIERS: &[Tier] = &[
    Tier { name: "placeholder_defendants", run: placeholder_defendants },
    Tier { name: "name_after_address", run: name_after_address },
    Tier { name: "after_zip", run: after_zip },
    Tier { name: "after_and", run: after_and },
    Tier { name: "after_and_blank", run: after_and_blank },
    Tier { name: "after_zip_block", run: after_zip_block },
];

/// Owner named on the caption page, the line right after `VS.`.
pub fn first_owner(caption_page: &str) -> Option<String> {
    run_chain("first_owner", FIRST_OWNER_TIERS, caption_page)
}

/// Co-owner from the defendant listing page.
pub fn second_owner(defendants_page: &str) -> Option<String> {
    run_chain("second_owner", SECOND_OWNER_TIERS, defendants_page)
}

pub fn caption_marker(text: &str) -> Step {
    CAPTION_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|name| !name.is_empty())
        .into()
}

/// Filings naming John/Jane Doe, heirs or an unknown spouse have no real
/// second owner; any name found further down would be wrong.
pub fn placeholder_defendants(text: &str) -> Step {
    if NO_SECOND_OWNER_RE.is_match(text) {
        Step::Stop
    } else {
        Step::Next
    }
}

pub fn name_after_address(text: &str) -> Step {
    NAME_AFTER_ADDRESS_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|name| !name.is_empty())
        .into()
}

pub fn after_zip(text: &str) -> Step {
    screened(&AFTER_ZIP_RE, text)
}

pub fn after_and(text: &str) -> Step {
    screened(&AFTER_AND_RE, text)
}

pub fn after_and_blank(text: &str) -> Step {
    screened(&AFTER_AND_BLANK_RE, text)
}

pub fn after_zip_block(text: &str) -> Step {
    screened(&AFTER_ZIP_BLOCK_RE, text)
}

fn screened(re: &Regex, text: &str) -> Step {
    let Some(caps) = re.captures(text) else {
        return Step::Next;
    };
    let candidate = &caps[1];
    if starts_with_any(candidate, SECOND_OWNER_REJECT) {
        return Step::Next;
    }
    let name = candidate.trim();
    if name.is_empty() {
        Step::Next
    } else {
        Step::Found(name.to_string())
    }
}
