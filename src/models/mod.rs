pub mod admin;
pub mod airdrop;
pub mod user;
pub mod withdrawal;

use serde::Deserialize;

/// Limit/offset pair accepted by every listing operation.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Page {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Page {
    /// Resolves the requested window against a default and a hard cap.
    pub fn resolve(&self, default_limit: u64, max_limit: u64) -> (u64, u64) {
        assert!(default_limit > 0, "Default page limit must be positive");
        assert!(
            default_limit <= max_limit,
            "Default page limit cannot exceed the cap"
        );
        let limit = self.limit.unwrap_or(default_limit).min(max_limit).max(1);
        let offset = self.offset.unwrap_or(0);
        (limit, offset)
    }
}
