use std::fmt;

use serde::{Deserialize, Serialize};

/// Browser tab identifier as reported by the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A navigation the browser is about to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationIntent {
    pub tab_id: TabId,
    #[serde(default)]
    pub frame_id: i64,
    pub url: String,
}

impl NavigationIntent {
    pub fn is_top_level(&self) -> bool {
        self.frame_id == 0
    }

    pub fn is_web(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationKey {
    pub tab_id: TabId,
    pub url: String,
}

impl NavigationKey {
    pub fn new(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            url: url.into(),
        }
    }
}
