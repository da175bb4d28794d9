use std::sync::LazyLock;

use regex::Regex;

use crate::parser::chain::{run_chain, Step, Tier};

const MARKER: &str = "[Property Address]";
const MARKER_LOOKBACK: usize = 3;

static ZIP_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{5}(?:-\d{4})?$").unwrap());
static LABEL_TO_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)property address:\s*(.*?\d{5}(?:-\d{4})?)").unwrap()
});
static LABEL_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Property Address:\s*(.+?)(?:\n\n|\n[a-zA-Z]|\z)").unwrap()
});
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub const TIERS: &[Tier] = &[
    Tier { name: "bracket_marker", run: bracket_marker },
    Tier { name: "label_to_zip", run: label_to_zip },
    Tier { name: "label_block", run: label_block },
];

pub fn extract(text: &str) -> Option<String> {
    run_chain("property_address", TIERS, text)
}

/// Address written on the lines just above a `[Property Address]` marker.
///
/// Lines are read bottom-up and accumulated until the address ends in a
/// zip code. Filings from Cincinnati often put the street one line further
/// up than the city line, so a bare `Cincinnati, OH` hit pulls in the line
/// above it; without one the tier gives up.
pub fn bracket_marker(text: &str) -> Step {
    let Some((before, _)) = text.split_once(MARKER) else {
        return Step::Next;
    };
    let lines: Vec<&str> = before.trim().split('\n').rev().collect();

    let mut address = String::new();
    for (i, line) in lines.iter().take(MARKER_LOOKBACK).enumerate() {
        let line = line.trim();
        address = if address.is_empty() {
            line.to_string()
        } else {
            format!("{}, {}", line, address)
        };

        if ZIP_TAIL_RE.is_match(&address) {
            if address.starts_with("Cincinnati, OH") {
                return match lines.get(i + 1) {
                    Some(street) => Step::Found(format!("{}, {}", street.trim(), address)),
                    None => Step::Next,
                };
            }
            return Step::Found(address);
        }
    }
    Step::Next
}

pub fn label_to_zip(text: &str) -> Step {
    let Some(caps) = LABEL_TO_ZIP_RE.captures(text) else {
        return Step::Next;
    };
    let address = &caps[1];
    // Note templates label a numbered clause, not an address.
    if address.starts_with("1. BORROWER'S") {
        return Step::Next;
    }
    Step::Found(address.to_string())
}

pub fn label_block(text: &str) -> Step {
    let Some(caps) = LABEL_BLOCK_RE.captures(text) else {
        return Step::Next;
    };
    let joined = caps[1].trim().replace('\n', ", ");
    let address = WHITESPACE_RE.replace_all(&joined, " ").trim().to_string();
    if address.is_empty() {
        Step::Next
    } else {
        Step::Found(address)
    }
}
