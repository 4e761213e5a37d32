//! Ordering rules used to decide which entries are drained first.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Candidate, EngineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SortKey {
    DateAdded,
    Remaining,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

/// Closed set of distribution strategies.
///
/// Each strategy is a primary and a secondary sort key over
/// `date_added` and the remaining (available) quantity. Remaining ties are
/// always broken by entry id ascending, so the same snapshot always yields
/// the same order.
///
/// The wire names read "primary_secondary": `old_many` means *oldest first,
/// then most remaining first*, `many_old` means *most remaining first, then
/// oldest first*.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributeStrategy {
    #[default]
    NewMany,
    NewFew,
    OldMany,
    OldFew,
    ManyNew,
    ManyOld,
    FewNew,
    FewOld,
}

impl DistributeStrategy {
    pub const ALL: [DistributeStrategy; 8] = [
        Self::NewMany,
        Self::NewFew,
        Self::OldMany,
        Self::OldFew,
        Self::ManyNew,
        Self::ManyOld,
        Self::FewNew,
        Self::FewOld,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewMany => "new_many",
            Self::NewFew => "new_few",
            Self::OldMany => "old_many",
            Self::OldFew => "old_few",
            Self::ManyNew => "many_new",
            Self::ManyOld => "many_old",
            Self::FewNew => "few_new",
            Self::FewOld => "few_old",
        }
    }

    fn keys(self) -> [(SortKey, Direction); 2] {
        use Direction::{Ascending, Descending};
        use SortKey::{DateAdded, Remaining};

        match self {
            Self::NewMany => [(DateAdded, Descending), (Remaining, Descending)],
            Self::NewFew => [(DateAdded, Descending), (Remaining, Ascending)],
            Self::OldMany => [(DateAdded, Ascending), (Remaining, Descending)],
            Self::OldFew => [(DateAdded, Ascending), (Remaining, Ascending)],
            Self::ManyNew => [(Remaining, Descending), (DateAdded, Descending)],
            Self::ManyOld => [(Remaining, Descending), (DateAdded, Ascending)],
            Self::FewNew => [(Remaining, Ascending), (DateAdded, Descending)],
            Self::FewOld => [(Remaining, Ascending), (DateAdded, Ascending)],
        }
    }

    /// Total order over candidates: strategy keys, then entry id ascending.
    pub fn compare(self, a: &Candidate, b: &Candidate) -> Ordering {
        for (key, direction) in self.keys() {
            let ord = match key {
                SortKey::DateAdded => a.date_added.cmp(&b.date_added),
                SortKey::Remaining => a.available.cmp(&b.available),
            };
            let ord = match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.entry_id.cmp(&b.entry_id)
    }
}

impl fmt::Display for DistributeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributeStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| EngineError::Invalid(format!("unknown distribute strategy: {wanted}")))
    }
}
