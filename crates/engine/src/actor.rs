//! The acting identity every engine operation runs as.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Capabilities granted to an actor.
///
/// `DoAnything` bypasses ownership checks. The `*Own` powers only reach
/// companies (and their entries, deeds and drains) owned by the actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    DoAnything,
    CreateOwn,
    ReadOwn,
    WriteOwn,
    DeleteOwn,
}

impl Power {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DoAnything => "do_anything",
            Self::CreateOwn => "create_own",
            Self::ReadOwn => "read_own",
            Self::WriteOwn => "write_own",
            Self::DeleteOwn => "delete_own",
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Power {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "do_anything" => Ok(Self::DoAnything),
            "create_own" => Ok(Self::CreateOwn),
            "read_own" => Ok(Self::ReadOwn),
            "write_own" => Ok(Self::WriteOwn),
            "delete_own" => Ok(Self::DeleteOwn),
            other => Err(EngineError::Invalid(format!("unknown power: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub powers: BTreeSet<Power>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, powers: impl IntoIterator<Item = Power>) -> Self {
        Self {
            user_id: user_id.into(),
            powers: powers.into_iter().collect(),
        }
    }

    /// An actor with every `*Own` power.
    pub fn owner(user_id: impl Into<String>) -> Self {
        Self::new(
            user_id,
            [
                Power::CreateOwn,
                Power::ReadOwn,
                Power::WriteOwn,
                Power::DeleteOwn,
            ],
        )
    }

    pub fn can(&self, power: Power) -> bool {
        self.powers.contains(&power)
    }

    pub fn is_superuser(&self) -> bool {
        self.can(Power::DoAnything)
    }
}
