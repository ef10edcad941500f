use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintCategory {
    /// All type tags of the target, e.g. "grass / poison".
    Types,
    /// First character of the target's name.
    FirstLetter,
    /// Not backed by evolution data yet; always yields `HintValue::NotYetImplemented`.
    EvolutionStage,
}

impl HintCategory {
    pub const ALL: [HintCategory; 3] = [
        HintCategory::Types,
        HintCategory::FirstLetter,
        HintCategory::EvolutionStage,
    ];

    pub fn is_implemented(self) -> bool {
        !matches!(self, HintCategory::EvolutionStage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum HintValue {
    Text(String),
    NotYetImplemented,
}

impl HintValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HintValue::Text(text) => Some(text),
            HintValue::NotYetImplemented => None,
        }
    }
}
