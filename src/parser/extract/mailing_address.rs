use std::sync::LazyLock;

use regex::Regex;

use crate::parser::chain::{run_chain, Step, Tier};

static NAME_THEN_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z\s]+\n((?:\d+.*\n)+[A-Z\s]+,\s+[A-Z]+\s+\d{5}(?:-\d{4})?)").unwrap()
});
static AFTER_PLAINTIFF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?i:Plaintiff).*?(?:\b\d{3}-\d{4}-\d{4}-\d{2}\b|PARCEL NUMBER:.*?\n|Parcel No\..*?\n)?(\d+.*?\d{5})",
    )
    .unwrap()
});
static LABELED_PARCEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Parcel No\. |Parcel No: |PPN# )\d{3}-\d{4}-\d{4}-\d{2}").unwrap()
});
static PARCEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{3}-\d{4}-\d{4}-\d{2}").unwrap());

const ADDRESS_UNKNOWN: &str = "Address Unknown";

/// Captures seen on real filings that are boilerplate, not an address.
pub const KNOWN_BAD_CAPTURES: &[&str] = &[
    "1. Plaintiff, Harvey Point",
    "2. There has been a default",
    "04920115-1 E-FILED",
    "593-0005-0175-00\n\n-VS-\n\nUnknown heirs,",
];

pub const TIERS: &[Tier] = &[
    Tier { name: "name_then_address", run: name_then_address },
    Tier { name: "after_plaintiff", run: after_plaintiff },
];

/// Owner's mailing address from the defendant listing page.
pub fn extract(defendants_page: &str) -> Option<String> {
    run_chain("mailing_address", TIERS, defendants_page)
}

/// All-caps name line, street line(s), then `CITY, ST 12345`.
pub fn name_then_address(text: &str) -> Step {
    match NAME_THEN_ADDRESS_RE.captures(text) {
        Some(caps) => screen(&caps[1]),
        None => Step::Next,
    }
}

/// First number-led run ending in a zip after "Plaintiff", skipping a
/// parcel number line if one sits in between.
pub fn after_plaintiff(text: &str) -> Step {
    match AFTER_PLAINTIFF_RE.captures(text) {
        Some(caps) => screen(&caps[1]),
        None => Step::Next,
    }
}

fn screen(raw: &str) -> Step {
    if raw.contains(ADDRESS_UNKNOWN) || is_known_bad(raw) {
        return Step::Stop;
    }
    let cleaned = strip_parcel_numbers(raw);
    let address = cleaned
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if address.is_empty() {
        Step::Next
    } else {
        Step::Found(address)
    }
}

fn is_known_bad(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    KNOWN_BAD_CAPTURES
        .iter()
        .any(|bad| lower.contains(&bad.to_lowercase()))
}

/// Remove labelled and bare `NNN-NNNN-NNNN-NN` parcel numbers.
pub fn strip_parcel_numbers(text: &str) -> String {
    let mut out = LABELED_PARCEL_RE.replace_all(text, "").into_owned();
    // Removing one number can splice digits into a new one.
    while PARCEL_RE.is_match(&out) {
        out = PARCEL_RE.replace_all(&out, "").into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_line_then_street_and_city() {
        let page = "ROBERT J MILLER\n1427 GRAND AVENUE\nCINCINNATI, OH 45205\nSUSAN K MILLER\n";
        assert_eq!(
            extract(page).as_deref(),
            Some("1427 GRAND AVENUE, CINCINNATI, OH 45205")
        );
    }

    #[test]
    fn bare_parcel_number_removed() {
        let page = "PLAINTIFF BANK\n\nvs.\n\nJOHN SMITH\n123 MAIN ST 248-0001-0142-00\nCINCINNATI, OH 45202\n";
        let address = extract(page).unwrap();
        assert_eq!(address, "123 MAIN ST, CINCINNATI, OH 45202");
        assert!(!PARCEL_RE.is_match(&address));
    }

    #[test]
    fn plaintiff_fallback_skips_parcel_line() {
        let page = "IN THE COURT OF COMMON PLEAS\nBank of Ohio,\nPlaintiff,\n\n-vs-\n\nMary Jones\nParcel No. 593-0005-0175-00\n77 Elm Street\nCincinnati, Ohio 45202\n";
        assert_eq!(name_then_address(page), Step::Next);
        assert_eq!(
            extract(page).as_deref(),
            Some("77 Elm Street, Cincinnati, Ohio 45202")
        );
    }

    #[test]
    fn labelled_parcel_inside_capture_removed() {
        let page = "Plaintiff\n\nvs.\n\nJOHN SMITH\n123 Main St PPN# 248-0001-0142-00 Cincinnati OH 45202";
        let address = extract(page).unwrap();
        assert!(address.starts_with("123 Main St"));
        assert!(address.ends_with("Cincinnati OH 45202"));
        assert!(!PARCEL_RE.is_match(&address));
        assert!(!address.contains("PPN#"));
    }

    #[test]
    fn spliced_parcel_numbers_fully_removed() {
        let out = strip_parcel_numbers("12 Oak 111-2222-333111-2222-3333-44-44 St");
        assert!(!PARCEL_RE.is_match(&out));
    }

    #[test]
    fn address_unknown_rejected() {
        let page = "Plaintiff\n\nvs.\n\nJOHN SMITH\n1 Address Unknown\nOhio 45202";
        assert_eq!(extract(page), None);
    }

    #[test]
    fn rejection_does_not_fall_through() {
        let page = "JOHN SMITH\n1 Address Unknown\nCINCINNATI, OH 45202\nPlaintiff 77 Elm 45211";
        assert_eq!(name_then_address(page), Step::Stop);
        assert_eq!(after_plaintiff(page), Step::Found("77 Elm 45211".into()));
        assert_eq!(extract(page), None);
    }

    #[test]
    fn known_bad_capture_rejected() {
        let page = "Plaintiff\n1. Plaintiff, Harvey Point Defense Testing Activity 12345";
        assert_eq!(extract(page), None);
    }

    #[test]
    fn nothing_to_find() {
        assert_eq!(extract("Defendants.\nCOUNT ONE\n"), None);
        assert_eq!(extract(""), None);
    }
}
