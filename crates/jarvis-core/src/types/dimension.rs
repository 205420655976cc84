use std::fmt;

use serde::{Deserialize, Serialize};

/// The three wellbeing dimensions every signal and pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Physical,
    Mental,
    Spiritual,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Self::Physical, Self::Mental, Self::Spiritual];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Mental => "mental",
            Self::Spiritual => "spiritual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "physical" => Some(Self::Physical),
            "mental" => Some(Self::Mental),
            "spiritual" => Some(Self::Spiritual),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
