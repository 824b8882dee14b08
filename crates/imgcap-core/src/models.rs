//! Caption models accepted by the node

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CaptionError;

/// Closed set of chat-completion models offered to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaptionModel {
    /// Vision + text
    #[default]
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "chatgpt-4o-latest")]
    ChatGpt4oLatest,
    #[serde(rename = "gpt-5")]
    Gpt5,
}

impl CaptionModel {
    /// All models in the order the host should list them
    pub const ALL: [CaptionModel; 3] = [
        CaptionModel::Gpt4o,
        CaptionModel::ChatGpt4oLatest,
        CaptionModel::Gpt5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionModel::Gpt4o => "gpt-4o",
            CaptionModel::ChatGpt4oLatest => "chatgpt-4o-latest",
            CaptionModel::Gpt5 => "gpt-5",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }
}

impl fmt::Display for CaptionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptionModel {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| {
                CaptionError::InvalidInput(format!(
                    "unknown model '{}', expected one of: {}",
                    s,
                    Self::names().join(", ")
                ))
            })
    }
}
