//! Airdrop campaign repository.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use serde_json::json;

use crate::entities::{airdrop, airdrop_task};
use crate::models::Page;
use crate::models::airdrop::{
    AirdropFilter, AirdropInput, AirdropPatch, AirdropStatus, AirdropView, TaskKind, TaskView,
};

use super::{PlatformStore, StoreError};

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 200;

impl PlatformStore {
    /// Inserts or fully replaces a campaign, task list included. The
    /// original creation timestamp survives a replace so that
    /// creation-time ordering stays stable.
    pub async fn upsert_airdrop(
        &self,
        actor: &str,
        input: &AirdropInput,
    ) -> Result<(), StoreError> {
        validate_input(input)?;
        let connection = self.db()?;
        let now = Utc::now();

        let requirements = serde_json::to_value(&input.requirements)
            .map_err(|err| StoreError::constraint(format!("requirements not serializable: {err}")))?;

        let model = airdrop::ActiveModel {
            id: Set(input.id.clone()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            logo: Set(input.logo.clone()),
            reward: Set(input.reward.clone()),
            total_reward: Set(input.total_reward.clone()),
            participants: Set(input.participants),
            max_participants: Set(input.max_participants),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            status: Set(input.status.as_str().to_string()),
            category: Set(input.category.clone()),
            blockchain: Set(input.blockchain.clone()),
            requirements: Set(requirements),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = connection.begin().await?;

        airdrop::Entity::insert(model)
            .on_conflict(
                OnConflict::column(airdrop::Column::Id)
                    .update_columns([
                        airdrop::Column::Title,
                        airdrop::Column::Description,
                        airdrop::Column::Logo,
                        airdrop::Column::Reward,
                        airdrop::Column::TotalReward,
                        airdrop::Column::Participants,
                        airdrop::Column::MaxParticipants,
                        airdrop::Column::StartDate,
                        airdrop::Column::EndDate,
                        airdrop::Column::Status,
                        airdrop::Column::Category,
                        airdrop::Column::Blockchain,
                        airdrop::Column::Requirements,
                        airdrop::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await?;

        airdrop_task::Entity::delete_many()
            .filter(airdrop_task::Column::AirdropId.eq(&input.id))
            .exec(&txn)
            .await?;

        let task_models: Vec<airdrop_task::ActiveModel> = input
            .tasks
            .iter()
            .enumerate()
            .map(|(position, task)| airdrop_task::ActiveModel {
                airdrop_id: Set(input.id.clone()),
                task_id: Set(task.id.clone()),
                position: Set(position as i32),
                kind: Set(task.kind.as_str().to_string()),
                title: Set(task.title.clone()),
                description: Set(task.description.clone()),
                url: Set(task.url.clone()),
                points: Set(task.points),
                required: Set(task.required),
            })
            .collect();
        if !task_models.is_empty() {
            airdrop_task::Entity::insert_many(task_models).exec(&txn).await?;
        }

        txn.commit().await?;

        self.record_audit(
            actor,
            "upsert_airdrop",
            "airdrop",
            &input.id,
            Some(json!({ "title": input.title, "tasks": input.tasks.len() })),
        )
        .await;
        Ok(())
    }

    /// Campaigns matching the filter, creation-time descending.
    pub async fn list_airdrops(
        &self,
        filter: &AirdropFilter,
        page: &Page,
    ) -> Result<Vec<AirdropView>, StoreError> {
        let connection = self.db()?;
        let (limit, offset) = page.resolve(DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);

        let mut select = airdrop::Entity::find();
        if let Some(status) = filter.status {
            select = select.filter(airdrop::Column::Status.eq(status.as_str()));
        }
        if let Some(category) = &filter.category {
            select = select.filter(airdrop::Column::Category.eq(category));
        }
        if let Some(blockchain) = &filter.blockchain {
            select = select.filter(airdrop::Column::Blockchain.eq(blockchain));
        }

        let rows = select
            .order_by_desc(airdrop::Column::CreatedAt)
            .order_by_desc(airdrop::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(connection)
            .await?;
        assert!(
            rows.len() <= limit as usize,
            "Returned more campaigns than requested"
        );

        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        let mut grouped: HashMap<String, Vec<TaskView>> = HashMap::new();
        if !ids.is_empty() {
            let tasks = airdrop_task::Entity::find()
                .filter(airdrop_task::Column::AirdropId.is_in(ids))
                .order_by_asc(airdrop_task::Column::Position)
                .all(connection)
                .await?;
            for task in tasks {
                let airdrop_id = task.airdrop_id.clone();
                grouped.entry(airdrop_id).or_default().push(task_view(task)?);
            }
        }

        rows.into_iter()
            .map(|row| {
                let tasks = grouped.remove(&row.id).unwrap_or_default();
                airdrop_view(row, tasks)
            })
            .collect()
    }

    pub async fn airdrop_by_id(&self, id: &str) -> Result<Option<AirdropView>, StoreError> {
        let connection = self.db()?;
        let Some(row) = airdrop::Entity::find_by_id(id).one(connection).await? else {
            return Ok(None);
        };
        let tasks = airdrop_task::Entity::find()
            .filter(airdrop_task::Column::AirdropId.eq(id))
            .order_by_asc(airdrop_task::Column::Position)
            .all(connection)
            .await?
            .into_iter()
            .map(task_view)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(airdrop_view(row, tasks)?))
    }

    /// Applies a partial update. Returns whether a campaign matched.
    pub async fn update_airdrop(
        &self,
        actor: &str,
        id: &str,
        patch: &AirdropPatch,
    ) -> Result<bool, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::constraint("patch contains no fields"));
        }
        let connection = self.db()?;

        let Some(current) = airdrop::Entity::find_by_id(id).one(connection).await? else {
            return Ok(false);
        };

        let mut updated = current.clone();
        if let Some(title) = &patch.title {
            updated.title = title.clone();
        }
        if let Some(description) = &patch.description {
            updated.description = description.clone();
        }
        if let Some(logo) = &patch.logo {
            updated.logo = logo.clone();
        }
        if let Some(reward) = &patch.reward {
            updated.reward = reward.clone();
        }
        if let Some(total_reward) = &patch.total_reward {
            updated.total_reward = total_reward.clone();
        }
        if let Some(participants) = patch.participants {
            updated.participants = participants;
        }
        if let Some(max_participants) = patch.max_participants {
            updated.max_participants = max_participants;
        }
        if let Some(start_date) = patch.start_date {
            updated.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            updated.end_date = end_date;
        }
        if let Some(status) = patch.status {
            updated.status = status.as_str().to_string();
        }
        if let Some(category) = &patch.category {
            updated.category = category.clone();
        }
        if let Some(blockchain) = &patch.blockchain {
            updated.blockchain = blockchain.clone();
        }
        if let Some(requirements) = &patch.requirements {
            updated.requirements = serde_json::to_value(requirements).map_err(|err| {
                StoreError::constraint(format!("requirements not serializable: {err}"))
            })?;
        }
        validate_row(&updated)?;

        let mut active = updated.into_active_model().reset_all();
        active.updated_at = Set(Utc::now());
        airdrop::Entity::update(active).exec(connection).await?;

        let details = serde_json::to_value(patch).ok();
        self.record_audit(actor, "update_airdrop", "airdrop", id, details)
            .await;
        Ok(true)
    }

    /// Removes a campaign and its tasks. Credited completions and any
    /// withdrawals stay untouched.
    pub async fn delete_airdrop(&self, actor: &str, id: &str) -> Result<bool, StoreError> {
        let connection = self.db()?;
        let txn = connection.begin().await?;

        airdrop_task::Entity::delete_many()
            .filter(airdrop_task::Column::AirdropId.eq(id))
            .exec(&txn)
            .await?;
        let result = airdrop::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }
        self.record_audit(actor, "delete_airdrop", "airdrop", id, None)
            .await;
        Ok(true)
    }
}

fn validate_input(input: &AirdropInput) -> Result<(), StoreError> {
    if input.id.trim().is_empty() {
        return Err(StoreError::constraint("airdrop id must not be empty"));
    }
    if input.title.trim().is_empty() {
        return Err(StoreError::constraint("airdrop title must not be empty"));
    }
    if input.participants < 0 {
        return Err(StoreError::constraint("participants must be non-negative"));
    }
    if input.max_participants < 0 {
        return Err(StoreError::constraint(
            "max participants must be non-negative",
        ));
    }
    if input.start_date >= input.end_date {
        return Err(StoreError::constraint(
            "start date must precede the end date",
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for task in &input.tasks {
        if task.id.trim().is_empty() {
            return Err(StoreError::constraint("task id must not be empty"));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(StoreError::constraint(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        if task.points <= 0 {
            return Err(StoreError::constraint(format!(
                "task {} must be worth positive points",
                task.id
            )));
        }
    }
    Ok(())
}

fn validate_row(row: &airdrop::Model) -> Result<(), StoreError> {
    if row.participants < 0 {
        return Err(StoreError::constraint("participants must be non-negative"));
    }
    if row.max_participants < 0 {
        return Err(StoreError::constraint(
            "max participants must be non-negative",
        ));
    }
    if row.start_date >= row.end_date {
        return Err(StoreError::constraint(
            "start date must precede the end date",
        ));
    }
    Ok(())
}

fn task_view(model: airdrop_task::Model) -> Result<TaskView, StoreError> {
    let kind = TaskKind::parse(&model.kind).ok_or_else(|| {
        StoreError::constraint(format!(
            "stored task kind {} is not recognized",
            model.kind
        ))
    })?;
    Ok(TaskView {
        id: model.task_id,
        kind,
        title: model.title,
        description: model.description,
        url: model.url,
        points: model.points,
        required: model.required,
    })
}

fn airdrop_view(row: airdrop::Model, tasks: Vec<TaskView>) -> Result<AirdropView, StoreError> {
    let status = AirdropStatus::parse(&row.status).ok_or_else(|| {
        StoreError::constraint(format!("stored status {} is not recognized", row.status))
    })?;
    let requirements: Vec<String> = serde_json::from_value(row.requirements)
        .map_err(|err| StoreError::constraint(format!("stored requirements malformed: {err}")))?;
    Ok(AirdropView {
        id: row.id,
        title: row.title,
        description: row.description,
        logo: row.logo,
        reward: row.reward,
        total_reward: row.total_reward,
        participants: row.participants,
        max_participants: row.max_participants,
        start_date: row.start_date,
        end_date: row.end_date,
        status,
        category: row.category,
        blockchain: row.blockchain,
        tasks,
        requirements,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::memory_store;
    use crate::store::tests_fixtures::{sample_airdrop, sample_task};

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = memory_store().await;
        let input = sample_airdrop("a1");
        store.upsert_airdrop("ops", &input).await.unwrap();

        let view = store
            .airdrop_by_id("a1")
            .await
            .unwrap()
            .expect("campaign exists");
        assert_eq!(view.id, input.id);
        assert_eq!(view.title, input.title);
        assert_eq!(view.status, input.status);
        assert_eq!(view.requirements, input.requirements);
        assert_eq!(view.tasks, input.tasks, "task order preserved");
    }

    #[tokio::test]
    async fn upsert_replaces_wholesale() {
        let store = memory_store().await;
        let mut input = sample_airdrop("a1");
        store.upsert_airdrop("ops", &input).await.unwrap();

        input.title = "Season two".to_string();
        input.tasks = vec![sample_task("t9", 75)];
        store.upsert_airdrop("ops", &input).await.unwrap();

        let view = store.airdrop_by_id("a1").await.unwrap().unwrap();
        assert_eq!(view.title, "Season two");
        assert_eq!(view.tasks.len(), 1);
        assert_eq!(view.tasks[0].id, "t9");
    }

    #[tokio::test]
    async fn invalid_inputs_rejected() {
        let store = memory_store().await;

        let mut inverted = sample_airdrop("a1");
        std::mem::swap(&mut inverted.start_date, &mut inverted.end_date);
        let err = store.upsert_airdrop("ops", &inverted).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let mut zero_points = sample_airdrop("a2");
        zero_points.tasks = vec![sample_task("t1", 0)];
        let err = store.upsert_airdrop("ops", &zero_points).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let mut duplicate = sample_airdrop("a3");
        duplicate.tasks = vec![sample_task("t1", 10), sample_task("t1", 20)];
        let err = store.upsert_airdrop("ops", &duplicate).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        assert!(store.airdrop_by_id("a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn participants_update_scenario() {
        let store = memory_store().await;
        let mut input = sample_airdrop("a1");
        input.max_participants = 100;
        input.participants = 0;
        store.upsert_airdrop("ops", &input).await.unwrap();

        let patch = AirdropPatch {
            participants: Some(1),
            ..Default::default()
        };
        let matched = store.update_airdrop("ops", "a1", &patch).await.unwrap();
        assert!(matched);
        let view = store.airdrop_by_id("a1").await.unwrap().unwrap();
        assert_eq!(view.participants, 1);

        let matched = store.update_airdrop("ops", "missing", &patch).await.unwrap();
        assert!(!matched, "unknown id matches nothing");
    }

    #[tokio::test]
    async fn empty_patch_rejected() {
        let store = memory_store().await;
        store.upsert_airdrop("ops", &sample_airdrop("a1")).await.unwrap();
        let err = store
            .update_airdrop("ops", "a1", &AirdropPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn patch_cannot_invert_dates() {
        let store = memory_store().await;
        let input = sample_airdrop("a1");
        store.upsert_airdrop("ops", &input).await.unwrap();

        let patch = AirdropPatch {
            end_date: Some(input.start_date),
            ..Default::default()
        };
        let err = store.update_airdrop("ops", "a1", &patch).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn list_filters_and_orders() {
        let store = memory_store().await;
        let mut first = sample_airdrop("a1");
        first.category = "DeFi".to_string();
        store.upsert_airdrop("ops", &first).await.unwrap();

        let mut second = sample_airdrop("a2");
        second.category = "Gaming".to_string();
        second.status = AirdropStatus::Upcoming;
        store.upsert_airdrop("ops", &second).await.unwrap();

        let all = store
            .list_airdrops(&AirdropFilter::default(), &Page::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "a2", "newest first");

        let active = store
            .list_airdrops(
                &AirdropFilter {
                    status: Some(AirdropStatus::Active),
                    ..Default::default()
                },
                &Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "a1");

        let gaming = store
            .list_airdrops(
                &AirdropFilter {
                    category: Some("Gaming".to_string()),
                    ..Default::default()
                },
                &Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(gaming.len(), 1);
        assert_eq!(gaming[0].id, "a2");

        let paged = store
            .list_airdrops(
                &AirdropFilter::default(),
                &Page {
                    limit: Some(1),
                    offset: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, "a1");
    }

    #[tokio::test]
    async fn delete_removes_campaign_and_tasks() {
        let store = memory_store().await;
        store.upsert_airdrop("ops", &sample_airdrop("a1")).await.unwrap();

        assert!(store.delete_airdrop("ops", "a1").await.unwrap());
        assert!(store.airdrop_by_id("a1").await.unwrap().is_none());
        assert!(
            !store.delete_airdrop("ops", "a1").await.unwrap(),
            "second delete matches nothing"
        );
        let remaining = store
            .list_airdrops(&AirdropFilter::default(), &Page::default())
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }
}
