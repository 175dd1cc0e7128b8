use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirdropStatus {
    Upcoming,
    Active,
    Completed,
}

impl AirdropStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upcoming" => Some(Self::Upcoming),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Telegram,
    Twitter,
    Discord,
    Website,
    Wallet,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Twitter => "twitter",
            Self::Discord => "discord",
            Self::Website => "website",
            Self::Wallet => "wallet",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "telegram" => Some(Self::Telegram),
            "twitter" => Some(Self::Twitter),
            "discord" => Some(Self::Discord),
            "website" => Some(Self::Website),
            "wallet" => Some(Self::Wallet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: String,
    pub kind: TaskKind,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub points: i32,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirdropView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub logo: String,
    pub reward: String,
    pub total_reward: String,
    pub participants: i32,
    pub max_participants: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: AirdropStatus,
    pub category: String,
    pub blockchain: String,
    /// Ordered as authored by the operator
    pub tasks: Vec<TaskView>,
    pub requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full campaign payload for insert-or-replace. The task list replaces any
/// previously stored tasks wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AirdropInput {
    pub id: String,
    pub title: String,
    pub description: String,
    pub logo: String,
    pub reward: String,
    pub total_reward: String,
    #[serde(default)]
    pub participants: i32,
    pub max_participants: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: AirdropStatus,
    pub category: String,
    pub blockchain: String,
    #[serde(default)]
    pub tasks: Vec<TaskView>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

/// Partial update. Absent fields are left untouched; unknown fields are
/// rejected at deserialization. The task list is not patchable — replace it
/// through an upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AirdropPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub reward: Option<String>,
    pub total_reward: Option<String>,
    pub participants: Option<i32>,
    pub max_participants: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<AirdropStatus>,
    pub category: Option<String>,
    pub blockchain: Option<String>,
    pub requirements: Option<Vec<String>>,
}

impl AirdropPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirdropFilter {
    pub status: Option<AirdropStatus>,
    pub category: Option<String>,
    pub blockchain: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            AirdropStatus::Upcoming,
            AirdropStatus::Active,
            AirdropStatus::Completed,
        ] {
            assert_eq!(AirdropStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AirdropStatus::parse("archived"), None);
    }

    #[test]
    fn task_kind_rejects_unknown() {
        assert_eq!(TaskKind::parse("tiktok"), None);
        assert_eq!(TaskKind::parse("wallet"), Some(TaskKind::Wallet));
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let err = serde_json::from_str::<AirdropPatch>(r#"{"titel":"typo"}"#);
        assert!(err.is_err(), "unknown field must be rejected");
    }

    #[test]
    fn empty_patch_detected() {
        assert!(AirdropPatch::default().is_empty());
        let patch = AirdropPatch {
            participants: Some(3),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
