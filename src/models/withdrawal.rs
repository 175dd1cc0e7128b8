use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Failed,
}

impl WithdrawalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalView {
    pub id: String,
    pub user_id: String,
    /// Points debited at request time; the integral source of truth
    pub amount: i32,
    /// Points-per-USDC snapshot captured at creation
    pub exchange_rate: i32,
    /// Derived for display: amount / exchange_rate, rounded to 2 decimals
    pub usdc_amount: f64,
    pub status: WithdrawalStatus,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rounds a point amount into a displayable USDC value. Only the two stored
/// integers are authoritative; this float never flows back into storage.
pub fn usdc_value(amount: i32, exchange_rate: i32) -> f64 {
    assert!(exchange_rate > 0, "Exchange rate must be positive");
    (f64::from(amount) / f64::from(exchange_rate) * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawalRequest {
    pub user_id: String,
    pub amount: i32,
}

/// Terminal transition for a pending withdrawal. Amount is deliberately
/// absent: it is immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawalResolution {
    pub status: WithdrawalStatus,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithdrawalFilter {
    pub user_id: Option<String>,
    pub status: Option<WithdrawalStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usdc_value_rounds_to_cents() {
        assert_eq!(usdc_value(100, 100), 1.0);
        assert_eq!(usdc_value(150, 100), 1.5);
        assert_eq!(usdc_value(1, 3), 0.33);
        assert_eq!(usdc_value(0, 100), 0.0);
    }

    #[test]
    fn resolution_rejects_amount_field() {
        let err =
            serde_json::from_str::<WithdrawalResolution>(r#"{"status":"completed","amount":5}"#);
        assert!(err.is_err(), "amount is immutable after creation");
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Completed,
            WithdrawalStatus::Failed,
        ] {
            assert_eq!(WithdrawalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(WithdrawalStatus::parse("cancelled"), None);
    }
}
