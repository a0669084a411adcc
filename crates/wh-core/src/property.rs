//! Property results and the checker trait.

use std::fmt;

use crate::counterexample::Counterexample;

/// Outcome of checking one named invariant.
#[derive(Debug, Clone)]
pub struct PropertyResult {
    /// Invariant name, e.g. `FIFO_Order`
    pub name: &'static str,
    /// Whether the invariant held
    pub holds: bool,
    /// What went wrong, if it did not hold
    pub violation: Option<String>,
    /// Failure path, when the checker could build one
    pub counterexample: Option<Counterexample>,
}

impl PropertyResult {
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        Self {
            name,
            holds: true,
            violation: None,
            counterexample: None,
        }
    }

    #[must_use]
    pub fn fail(
        name: &'static str,
        violation: String,
        counterexample: Option<Counterexample>,
    ) -> Self {
        debug_assert!(!violation.is_empty(), "Violation message should not be empty");
        Self {
            name,
            holds: false,
            violation: Some(violation),
            counterexample,
        }
    }
}

impl fmt::Display for PropertyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.violation {
            None => write!(f, "[PASS] {}", self.name),
            Some(violation) => {
                write!(f, "[FAIL] {}: {}", self.name, violation)?;
                if let Some(ce) = &self.counterexample {
                    write!(f, "\n{}", ce.render_diagram())?;
                }
                Ok(())
            }
        }
    }
}

/// Something that can check a family of invariants.
pub trait PropertyChecker {
    /// Check every invariant, in a fixed order.
    fn check_all(&self) -> Vec<PropertyResult>;

    /// True if every invariant holds.
    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.holds)
    }

    /// Only the failing results.
    fn violations(&self) -> Vec<PropertyResult> {
        self.check_all().into_iter().filter(|r| !r.holds).collect()
    }

    /// One line per invariant, for test output.
    fn report(&self) -> String {
        self.check_all()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<PropertyResult>);

    impl PropertyChecker for Fixed {
        fn check_all(&self) -> Vec<PropertyResult> {
            self.0.clone()
        }
    }

    #[test]
    fn test_all_hold_and_violations() {
        let checker = Fixed(vec![
            PropertyResult::pass("A"),
            PropertyResult::fail("B", "broken".to_string(), None),
        ]);
        assert!(!checker.all_hold());

        let violations = checker.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].name, "B");

        let report = checker.report();
        assert!(report.contains("[PASS] A"));
        assert!(report.contains("[FAIL] B: broken"));
    }

    #[test]
    fn test_empty_checker_holds() {
        assert!(Fixed(Vec::new()).all_hold());
    }
}
