use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two buses a batch rides on.
///
/// Each role owns a distinct label, readiness token and position so the
/// coordinator can tell its workers apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BusRole {
    First,
    Second,
}

impl BusRole {
    /// Roles in dispatch order.
    pub const ALL: [BusRole; 2] = [BusRole::First, BusRole::Second];

    /// Human-readable label carried in completion records.
    pub const fn label(self) -> &'static str {
        match self {
            BusRole::First => "first bus",
            BusRole::Second => "second bus",
        }
    }

    /// 1-based position in the dispatch sequence.
    pub const fn ordinal(self) -> u8 {
        match self {
            BusRole::First => 1,
            BusRole::Second => 2,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.label() == label)
    }
}

impl fmt::Display for BusRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_ordinals_are_distinct() {
        assert_ne!(BusRole::First.label(), BusRole::Second.label());
        assert_ne!(BusRole::First.ordinal(), BusRole::Second.ordinal());
    }

    #[test]
    fn lookups_roundtrip() {
        for role in BusRole::ALL {
            assert_eq!(BusRole::from_label(role.label()), Some(role));
        }
        assert_eq!(BusRole::from_label("third bus"), None);
    }
}
