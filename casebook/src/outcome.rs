//! Positional comparison of captured outputs against expectations.

use std::fmt;

use crate::invoke::Outputs;

/// First divergence between actual and expected outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Different numbers of outputs.
    Count {
        /// Number of expected outputs.
        expected: usize,
        /// Number of captured outputs.
        actual: usize,
    },
    /// The output at `index` differs.
    Value {
        /// Zero-based position of the output.
        index: usize,
        /// Debug rendering of the expected value.
        expected: String,
        /// Debug rendering of the captured value.
        actual: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count { expected, actual } => {
                write!(f, "expected {expected} output(s), got {actual}")
            }
            Self::Value {
                index,
                expected,
                actual,
            } => write!(f, "output {index}: expected {expected}, got {actual}"),
        }
    }
}

/// Compares outputs position by position and returns the first mismatch.
///
/// Counts are compared first. Values use their own `PartialEq`, so
/// collections compare element-wise and floats compare exactly. When the two
/// values have different types both renderings carry the type name.
#[must_use]
pub fn first_mismatch(actual: &Outputs, expected: &Outputs) -> Option<Mismatch> {
    if actual.len() != expected.len() {
        return Some(Mismatch::Count {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    actual
        .iter()
        .zip(expected)
        .position(|(got, want)| !got.matches(want))
        .and_then(|index| {
            let got = actual.get(index)?;
            let want = expected.get(index)?;
            Some(if got.type_name() == want.type_name() {
                Mismatch::Value {
                    index,
                    expected: format!("{want:?}"),
                    actual: format!("{got:?}"),
                }
            } else {
                Mismatch::Value {
                    index,
                    expected: format!("{want:?} ({})", want.type_name()),
                    actual: format!("{got:?} ({})", got.type_name()),
                }
            })
        })
}

#[cfg(test)]
mod tests {
    use super::{Mismatch, first_mismatch};
    use crate::invoke::{IntoOutputs, Output, Outputs};

    #[test]
    fn equal_tuples_match() {
        assert_eq!(first_mismatch(&(3, 1).into_outputs(), &(3, 1).into_outputs()), None);
    }

    #[test]
    fn reports_the_first_diverging_index() {
        let mismatch = first_mismatch(&(3, 1, 5).into_outputs(), &(3, 0, 4).into_outputs());
        assert_eq!(
            mismatch,
            Some(Mismatch::Value {
                index: 1,
                expected: "0".into(),
                actual: "1".into(),
            })
        );
    }

    #[test]
    fn collections_compare_by_length_and_elements() {
        let mismatch = first_mismatch(&vec![1, 2].into_outputs(), &vec![1, 2, 3].into_outputs());
        assert_eq!(
            mismatch.map(|m| m.to_string()),
            Some(String::from("output 0: expected [1, 2, 3], got [1, 2]"))
        );
    }

    #[test]
    fn floats_compare_exactly() {
        assert!(first_mismatch(&0.3_f64.into_outputs(), &0.3_f64.into_outputs()).is_none());
        assert!(first_mismatch(&(0.1_f64 + 0.2).into_outputs(), &0.3_f64.into_outputs()).is_some());
        assert!(first_mismatch(&f64::NAN.into_outputs(), &f64::NAN.into_outputs()).is_some());
    }

    #[test]
    fn differing_types_never_match() {
        let actual = Outputs::new(vec![Output::new(3_i32)]);
        let expected = Outputs::new(vec![Output::new(3_i64)]);
        assert_eq!(
            first_mismatch(&actual, &expected).map(|m| m.to_string()),
            Some(String::from("output 0: expected 3 (i64), got 3 (i32)"))
        );
    }

    #[test]
    fn count_mismatch_is_reported_first() {
        assert_eq!(
            first_mismatch(&(1, 2).into_outputs(), &Outputs::single(1)),
            Some(Mismatch::Count {
                expected: 1,
                actual: 2,
            })
        );
    }
}
