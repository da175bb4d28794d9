use tracing::trace;

/// Outcome of one tier of a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Accepted value; the chain ends here.
    Found(String),
    /// Nothing usable; try the next tier.
    Next,
    /// Guard fired or the capture is known boilerplate; the field is absent.
    Stop,
}

impl From<Option<String>> for Step {
    fn from(value: Option<String>) -> Self {
        value.map_or(Step::Next, Step::Found)
    }
}

pub struct Tier {
    pub name: &'static str,
    pub run: fn(&str) -> Step,
}

/// Evaluate tiers in order; first `Found` wins, `Stop` ends with nothing.
pub fn run_chain(field: &'static str, tiers: &[Tier], text: &str) -> Option<String> {
    for tier in tiers {
        match (tier.run)(text) {
            Step::Found(value) => {
                trace!(field, tier = tier.name, "matched");
                return Some(value);
            }
            Step::Stop => {
                trace!(field, tier = tier.name, "stopped");
                return None;
            }
            Step::Next => {}
        }
    }
    None
}

/// True when `candidate` begins with any phrase of `reject`, ignoring case.
pub fn starts_with_any(candidate: &str, reject: &[&str]) -> bool {
    let lower = candidate.to_lowercase();
    reject.iter().any(|phrase| lower.starts_with(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found_a(_: &str) -> Step {
        Step::Found("a".into())
    }

    fn next(_: &str) -> Step {
        Step::Next
    }

    fn stop(_: &str) -> Step {
        Step::Stop
    }

    #[test]
    fn first_found_wins() {
        let tiers = [
            Tier { name: "skip", run: next },
            Tier { name: "a", run: found_a },
            Tier { name: "never", run: stop },
        ];
        assert_eq!(run_chain("t", &tiers, ""), Some("a".into()));
    }

    #[test]
    fn stop_short_circuits() {
        let tiers = [
            Tier { name: "stop", run: stop },
            Tier { name: "a", run: found_a },
        ];
        assert_eq!(run_chain("t", &tiers, ""), None);
    }

    #[test]
    fn exhausted_chain_is_none() {
        let tiers = [Tier { name: "skip", run: next }];
        assert_eq!(run_chain("t", &tiers, ""), None);
        assert_eq!(run_chain("t", &[], ""), None);
    }

    #[test]
    fn reject_prefix_is_case_insensitive() {
        assert!(starts_with_any("PLAINTIFF BANK", &["plaintiff"]));
        assert!(!starts_with_any("Mary plaintiff", &["plaintiff"]));
    }
}
