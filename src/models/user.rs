use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completed tasks grouped by campaign: airdrop id -> ordered task ids.
pub type CompletedTaskMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub wallet_address: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub discord: Option<String>,
    pub completed_tasks: CompletedTaskMap,
    pub total_points: i32,
    pub is_connected: bool,
    pub balance: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Insert-or-replace payload for admin edits. Completion rows are owned by
/// the task-completion flow and are not rewritten here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserInput {
    pub id: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub discord: Option<String>,
    #[serde(default)]
    pub total_points: i32,
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub balance: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UserPatch {
    pub wallet_address: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub discord: Option<String>,
    pub total_points: Option<i32>,
    pub is_connected: Option<bool>,
    pub balance: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub connected: Option<bool>,
    pub min_points: Option<i32>,
}

/// Opaque payload delivered by the external wallet provider on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConnection {
    pub address: String,
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(default)]
    pub chain_id: Option<i64>,
}

/// Task-completion request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionRequest {
    pub airdrop_id: String,
    pub task_id: String,
}
