//! Batch planning.
//!
//! Pure function of the day's roster view: no IPC happens here.
use shuttle_model::{BusRole, MAX_APPLICANTS_PER_DAY};

use crate::{DispatchError, DispatchResult};

/// At this many applicants the day is split across two buses.
pub const SPLIT_THRESHOLD: usize = 5;

/// Most names a single worker receives.
pub const BUS_CAPACITY: usize = 5;

/// Most applicants one dispatch can carry.
pub const MAX_DISPATCH: usize = BUS_CAPACITY * BusRole::ALL.len();

const _: () = assert!(SPLIT_THRESHOLD <= BUS_CAPACITY);
const _: () = assert!(MAX_APPLICANTS_PER_DAY <= MAX_DISPATCH);

/// Names handed to one worker, in roster order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub role: BusRole,
    pub names: Vec<String>,
}

/// Ordered batches of one dispatch. Empty when nobody is available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchPlan {
    pub batches: Vec<Batch>,
}

impl DispatchPlan {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total names across all batches.
    pub fn total(&self) -> usize {
        self.batches.iter().map(|b| b.names.len()).sum()
    }
}

/// Split `names` into batches.
///
/// Fewer than [`SPLIT_THRESHOLD`] names ride the first bus alone. From the
/// threshold on, the first [`BUS_CAPACITY`] names take the first bus and the
/// rest the second, which runs even when it has nobody to carry.
pub fn plan(names: &[String]) -> DispatchResult<DispatchPlan> {
    if names.len() > MAX_DISPATCH {
        return Err(DispatchError::TooManyApplicants {
            count: names.len(),
            max: MAX_DISPATCH,
        });
    }
    if let Some(bad) = names.iter().find(|n| n.is_empty() || n.contains('\n')) {
        return Err(DispatchError::InvalidName(bad.clone()));
    }

    let batches = match names.len() {
        0 => Vec::new(),
        n if n < SPLIT_THRESHOLD => vec![Batch {
            role: BusRole::First,
            names: names.to_vec(),
        }],
        _ => {
            let (first, second) = names.split_at(BUS_CAPACITY);
            vec![
                Batch {
                    role: BusRole::First,
                    names: first.to_vec(),
                },
                Batch {
                    role: BusRole::Second,
                    names: second.to_vec(),
                },
            ]
        }
    };
    Ok(DispatchPlan { batches })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("P{i}")).collect()
    }

    #[test]
    fn nobody_means_no_batches() {
        let p = plan(&[]).unwrap();
        assert!(p.is_empty());
        assert_eq!(p.total(), 0);
    }

    #[test]
    fn below_threshold_uses_one_bus() {
        for n in 1..SPLIT_THRESHOLD {
            let p = plan(&names(n)).unwrap();
            assert_eq!(p.batches.len(), 1);
            assert_eq!(p.batches[0].role, BusRole::First);
            assert_eq!(p.batches[0].names, names(n));
        }
    }

    #[test]
    fn threshold_splits_with_empty_second_bus() {
        let p = plan(&names(5)).unwrap();
        assert_eq!(p.batches.len(), 2);
        assert_eq!(p.batches[0].names.len(), 5);
        assert_eq!(p.batches[1].role, BusRole::Second);
        assert!(p.batches[1].names.is_empty());
    }

    #[test]
    fn seven_split_five_and_two_in_order() {
        let all: Vec<String> = ["A", "B", "C", "D", "E", "F", "G"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let p = plan(&all).unwrap();
        assert_eq!(p.batches[0].names, ["A", "B", "C", "D", "E"]);
        assert_eq!(p.batches[1].names, ["F", "G"]);
        assert_eq!(p.total(), 7);
    }

    #[test]
    fn full_day_fits_and_more_is_rejected() {
        let p = plan(&names(MAX_DISPATCH)).unwrap();
        assert_eq!(p.batches[1].names.len(), BUS_CAPACITY);

        let err = plan(&names(MAX_DISPATCH + 1)).unwrap_err();
        assert!(matches!(err, DispatchError::TooManyApplicants { count: 11, max: 10 }));
    }

    #[test]
    fn names_must_be_single_records() {
        let bad = vec!["ok".to_string(), "two\nlines".to_string()];
        assert!(matches!(plan(&bad).unwrap_err(), DispatchError::InvalidName(_)));
        assert!(matches!(
            plan(&[String::new()]).unwrap_err(),
            DispatchError::InvalidName(_)
        ));
    }
}
