//! Deterministic SQL-text export and restore.
//!
//! One `INSERT` per record, tables in a fixed order, rows ordered by primary
//! key, so identical store contents always serialize to identical text.
//! String values have their single quotes doubled; the statement splitter is
//! quote-aware, so embedded newlines, semicolons and comment markers survive
//! the round trip. The audit log is deliberately not exported: a restore
//! must not fabricate audit history.

use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, EntityTrait, QueryOrder, Statement,
};

use crate::entities::{airdrop, airdrop_task, setting, task_completion, user, withdrawal};

use super::{PlatformStore, StoreError};

impl PlatformStore {
    /// Serializes every entity table plus the settings table to a portable
    /// `.sql` script.
    pub async fn export_sql(&self) -> Result<String, StoreError> {
        let connection = self.db()?;
        let mut out = String::new();
        out.push_str("-- AirdropHub database export\n");
        out.push_str("-- One INSERT per row, grouped by table. Restore into a fresh store.\n");

        out.push_str("\n-- airdrops\n");
        let airdrops = airdrop::Entity::find()
            .order_by_asc(airdrop::Column::Id)
            .all(connection)
            .await?;
        for row in airdrops {
            let requirements = serde_json::to_string(&row.requirements).map_err(|err| {
                StoreError::constraint(format!("stored requirements malformed: {err}"))
            })?;
            out.push_str(&format!(
                "INSERT INTO airdrops (id, title, description, logo, reward, total_reward, participants, max_participants, start_date, end_date, status, category, blockchain, requirements, created_at, updated_at) VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {});\n",
                sql_str(&row.id),
                sql_str(&row.title),
                sql_str(&row.description),
                sql_str(&row.logo),
                sql_str(&row.reward),
                sql_str(&row.total_reward),
                row.participants,
                row.max_participants,
                sql_datetime(row.start_date),
                sql_datetime(row.end_date),
                sql_str(&row.status),
                sql_str(&row.category),
                sql_str(&row.blockchain),
                sql_str(&requirements),
                sql_datetime(row.created_at),
                sql_datetime(row.updated_at),
            ));
        }

        out.push_str("\n-- airdrop_tasks\n");
        let tasks = airdrop_task::Entity::find()
            .order_by_asc(airdrop_task::Column::AirdropId)
            .order_by_asc(airdrop_task::Column::Position)
            .all(connection)
            .await?;
        for row in tasks {
            out.push_str(&format!(
                "INSERT INTO airdrop_tasks (airdrop_id, task_id, position, kind, title, description, url, points, required) VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {});\n",
                sql_str(&row.airdrop_id),
                sql_str(&row.task_id),
                row.position,
                sql_str(&row.kind),
                sql_str(&row.title),
                sql_str(&row.description),
                sql_opt_str(row.url.as_deref()),
                row.points,
                sql_bool(row.required),
            ));
        }

        out.push_str("\n-- users\n");
        let users = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(connection)
            .await?;
        for row in users {
            out.push_str(&format!(
                "INSERT INTO users (id, wallet_address, telegram, twitter, discord, total_points, is_connected, balance, joined_at, last_active, created_at, updated_at) VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {});\n",
                sql_str(&row.id),
                sql_opt_str(row.wallet_address.as_deref()),
                sql_opt_str(row.telegram.as_deref()),
                sql_opt_str(row.twitter.as_deref()),
                sql_opt_str(row.discord.as_deref()),
                row.total_points,
                sql_bool(row.is_connected),
                sql_opt_str(row.balance.as_deref()),
                sql_datetime(row.joined_at),
                sql_datetime(row.last_active),
                sql_datetime(row.created_at),
                sql_datetime(row.updated_at),
            ));
        }

        out.push_str("\n-- task_completions\n");
        let completions = task_completion::Entity::find()
            .order_by_asc(task_completion::Column::UserId)
            .order_by_asc(task_completion::Column::AirdropId)
            .order_by_asc(task_completion::Column::TaskId)
            .all(connection)
            .await?;
        for row in completions {
            out.push_str(&format!(
                "INSERT INTO task_completions (user_id, airdrop_id, task_id, points, completed_at) VALUES ({}, {}, {}, {}, {});\n",
                sql_str(&row.user_id),
                sql_str(&row.airdrop_id),
                sql_str(&row.task_id),
                row.points,
                sql_datetime(row.completed_at),
            ));
        }

        out.push_str("\n-- withdrawals\n");
        let withdrawals = withdrawal::Entity::find()
            .order_by_asc(withdrawal::Column::Id)
            .all(connection)
            .await?;
        for row in withdrawals {
            out.push_str(&format!(
                "INSERT INTO withdrawals (id, user_id, amount, exchange_rate, status, tx_hash, created_at, updated_at) VALUES ({}, {}, {}, {}, {}, {}, {}, {});\n",
                sql_str(&row.id),
                sql_str(&row.user_id),
                row.amount,
                row.exchange_rate,
                sql_str(&row.status),
                sql_opt_str(row.tx_hash.as_deref()),
                sql_datetime(row.created_at),
                sql_datetime(row.updated_at),
            ));
        }

        // A fresh target store already carries the seeded defaults, so
        // settings upsert instead of plain-inserting.
        out.push_str("\n-- settings\n");
        let settings = setting::Entity::find()
            .order_by_asc(setting::Column::Key)
            .all(connection)
            .await?;
        for row in settings {
            out.push_str(&format!(
                "INSERT INTO settings (key, value, updated_at) VALUES ({}, {}, {}) ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at;\n",
                sql_str(&row.key),
                sql_str(&row.value),
                sql_datetime(row.updated_at),
            ));
        }

        Ok(out)
    }

    /// Executes an exported script against this store. Intended for
    /// restoring into a freshly opened store; imports are not audited.
    pub async fn import_sql(&self, script: &str) -> Result<u64, StoreError> {
        let connection = self.db()?;
        let mut executed = 0u64;
        for statement in split_statements(script) {
            connection
                .execute(Statement::from_string(DatabaseBackend::Sqlite, statement))
                .await?;
            executed += 1;
        }
        Ok(executed)
    }
}

fn sql_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn sql_opt_str(value: Option<&str>) -> String {
    match value {
        Some(value) => sql_str(value),
        None => "NULL".to_string(),
    }
}

fn sql_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn sql_datetime(value: DateTime<Utc>) -> String {
    sql_str(&value.to_rfc3339())
}

/// Splits a script into executable statements, honoring single-quoted
/// strings (with `''` escapes) and dropping `--` comment lines between
/// statements.
pub(crate) fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = script.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_string {
            current.push(ch);
            if ch == '\'' {
                // A doubled quote re-enters string state on the next char.
                in_string = false;
            }
            continue;
        }
        match ch {
            '\'' => {
                in_string = true;
                current.push(ch);
            }
            '-' if chars.peek() == Some(&'-') && current.trim().is_empty() => {
                current.clear();
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            ';' => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    let trailing = current.trim();
    if !trailing.is_empty() {
        statements.push(trailing.to_string());
    }
    statements
}
