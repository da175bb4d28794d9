use std::sync::LazyLock;

use regex::Regex;

use crate::parser::chain::{run_chain, Step, Tier};

// Dollar amount: `$` + digits with optional thousands commas + optional cents.
static LOAN_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)LOAN\s*(?:AMOUNT)?\s*:\s*(\$[\d,]+(?:\.\d{2})?)").unwrap()
});
static PRINCIPAL_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Principal\s*(?:AMOUNT)?\s*:\s*(\$[\d,]+(?:\.\d{2})?)").unwrap()
});
static AMOUNT_BEFORE_RATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\$[\d,]+(?:\.\d{2})?).*?\d+\.\d+%").unwrap());
static ORIGINAL_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)original\s*(?:AMOUNT)?\s*.*?(\$[\d,]+(?:\.\d{2})?)").unwrap()
});
static PROMISE_TO_PAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)promise to pay.*?(\$[\d,]+(?:\.\d{2})?)").unwrap());
static HOA_SUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"owes the Association the sum of .*?\(\$(\d{1,3}(?:,\d{3})*\.\d{2})\)").unwrap()
});

/// Most specific label first; the bare amount-near-a-rate heuristic sits in
/// the middle because loan terms usually state principal and rate together.
pub const PRICE_TIERS: &[Tier] = &[
    Tier { name: "loan_amount", run: loan_amount },
    Tier { name: "principal_amount", run: principal_amount },
    Tier { name: "amount_before_rate", run: amount_before_rate },
    Tier { name: "original_amount", run: original_amount },
    Tier { name: "promise_to_pay", run: promise_to_pay },
];

pub const HOA_TIERS: &[Tier] = &[Tier { name: "association_sum", run: association_sum }];

/// Loan principal secured by the property.
pub fn property_price(text: &str) -> Option<String> {
    run_chain("property_price", PRICE_TIERS, text)
}

/// Assessment owed to a homeowners' association.
pub fn hoa_amount(text: &str) -> Option<String> {
    run_chain("hoa_amount", HOA_TIERS, text)
}

pub fn loan_amount(text: &str) -> Step {
    first_group(&LOAN_AMOUNT_RE, text)
}

pub fn principal_amount(text: &str) -> Step {
    first_group(&PRINCIPAL_AMOUNT_RE, text)
}

pub fn amount_before_rate(text: &str) -> Step {
    first_group(&AMOUNT_BEFORE_RATE_RE, text)
}

pub fn original_amount(text: &str) -> Step {
    first_group(&ORIGINAL_AMOUNT_RE, text)
}

pub fn promise_to_pay(text: &str) -> Step {
    first_group(&PROMISE_TO_PAY_RE, text)
}

pub fn association_sum(text: &str) -> Step {
    HOA_SUM_RE
        .captures(text)
        .map(|c| format!("${}", &c[1]))
        .into()
}

fn first_group(re: &Regex, text: &str) -> Step {
    re.captures(text).map(|c| c[1].to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loan_amount_wins_over_promise_to_pay() {
        let text = "I promise to pay U.S. $98,000.00 to the Lender.\nLOAN AMOUNT: $150,000.00\n";
        assert_eq!(promise_to_pay(text), Step::Found("$98,000.00".into()));
        assert_eq!(property_price(text).as_deref(), Some("$150,000.00"));
    }

    #[test]
    fn loan_label_variants() {
        assert_eq!(property_price("Loan: $1,000").as_deref(), Some("$1,000"));
        assert_eq!(property_price("loan amount :  $72,150.25").as_deref(), Some("$72,150.25"));
        assert_eq!(loan_amount("Loan Number: 0045521987 $5.00"), Step::Next);
    }

    #[test]
    fn principal_amount_label() {
        let text = "Principal Amount: $212,000.00\nsomething $5.00 at 3.5%";
        assert_eq!(property_price(text).as_deref(), Some("$212,000.00"));
    }

    #[test]
    fn amount_on_same_line_as_rate() {
        let text = "Fee $25.00\nNote for $88,400.00 bearing interest at 6.125% per annum";
        assert_eq!(property_price(text).as_deref(), Some("$88,400.00"));
    }

    #[test]
    fn amount_and_rate_on_different_lines_do_not_pair() {
        let text = "Fee $25.00\nrate 6.125%";
        assert_eq!(amount_before_rate(text), Step::Next);
        assert_eq!(property_price(text), None);
    }

    #[test]
    fn original_amount_then_promise_to_pay() {
        let text = "in the original amount of $64,000 secured by";
        assert_eq!(property_price(text).as_deref(), Some("$64,000"));

        let text = "Borrower's promise to pay the sum of $33,500.00 plus interest";
        assert_eq!(property_price(text).as_deref(), Some("$33,500.00"));
    }

    #[test]
    fn no_amount() {
        assert_eq!(property_price("LOAN AMOUNT: to be determined"), None);
        assert_eq!(property_price(""), None);
    }

    #[test]
    fn hoa_sum_in_parentheses() {
        let text = "Defendant owes the Association the sum of Four Thousand Two Hundred Twelve and 50/100 Dollars ($4,212.50) for assessments";
        assert_eq!(hoa_amount(text).as_deref(), Some("$4,212.50"));
    }

    #[test]
    fn hoa_requires_exact_phrase_and_cents() {
        assert_eq!(hoa_amount("owes the association the sum of ($100.00)"), None);
        assert_eq!(hoa_amount("owes the Association the sum of ($100)"), None);
        assert_eq!(hoa_amount("owes the Association the sum of\n($100.00)"), None);
    }
}
