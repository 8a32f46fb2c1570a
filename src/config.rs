use serde::{Deserialize, Serialize};

/// Default cap on bibliography lookups in flight at once.
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReshapeOptions {
    /// Link numeric `[N]` markers to references and group adjacent
    /// citations. Off by default: it can move punctuation on some inputs.
    pub reshape_citations: bool,
    /// Bibliography entries resolved per batch.
    pub max_concurrent_lookups: usize,
}

impl Default for ReshapeOptions {
    fn default() -> Self {
        Self {
            reshape_citations: false,
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }
}

impl ReshapeOptions {
    pub fn batch_size(&self) -> usize {
        self.max_concurrent_lookups.max(1)
    }
}
