use crate::db::{call, room};
use crate::{Call, CallError, CallState, CallStore, NewCall, Result, Transition};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{debug, info};

/// 通话仓库
pub struct CallRepository {
    db: Arc<DatabaseConnection>,
}

impl CallRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn load(&self, call_id: &str) -> Result<Call> {
        call::Entity::find_by_id(call_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| CallError::NotFound(call_id.to_string()))
            .and_then(Call::try_from)
    }

    fn timestamp_column(target: CallState) -> Option<call::Column> {
        match target {
            CallState::Ringing => None,
            CallState::Answered => Some(call::Column::AnsweredAt),
            CallState::Ended => Some(call::Column::EndedAt),
        }
    }
}

#[async_trait]
impl CallStore for CallRepository {
    async fn ensure_room(&self, room_name: &str, at: DateTime<Utc>) -> Result<()> {
        let model = room::ActiveModel {
            room_name: Set(room_name.to_string()),
            created_at: Set(at),
        };

        room::Entity::insert(model)
            .on_conflict(
                OnConflict::column(room::Column::RoomName)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        Ok(())
    }

    async fn find_ringing(
        &self,
        callee_identity: &str,
        room_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Call>> {
        let model = call::Entity::find()
            .filter(call::Column::CalleeIdentity.eq(callee_identity))
            .filter(call::Column::RoomName.eq(room_name))
            .filter(call::Column::State.eq(CallState::Ringing.as_str()))
            .filter(call::Column::CreatedAt.gte(since))
            .order_by_desc(call::Column::CreatedAt)
            .one(&*self.db)
            .await?;

        model.map(Call::try_from).transpose()
    }

    async fn create(&self, new_call: NewCall, at: DateTime<Utc>) -> Result<Call> {
        let created = Call {
            call_id: uuid::Uuid::new_v4().to_string(),
            caller_identity: new_call.caller_identity,
            callee_identity: new_call.callee_identity,
            room_name: new_call.room_name,
            state: CallState::Ringing,
            created_at: at,
            answered_at: None,
            ended_at: None,
        };

        let model = call::ActiveModel {
            call_id: Set(created.call_id.clone()),
            caller_identity: Set(created.caller_identity.clone()),
            callee_identity: Set(created.callee_identity.clone()),
            room_name: Set(created.room_name.clone()),
            state: Set(created.state.as_str().to_string()),
            created_at: Set(at),
            answered_at: Set(None),
            ended_at: Set(None),
        };

        call::Entity::insert(model)
            .exec_without_returning(&*self.db)
            .await?;

        info!(
            call_id = %created.call_id,
            room = %created.room_name,
            "Call created"
        );
        Ok(created)
    }

    async fn transition(&self, call_id: &str, target: CallState, at: DateTime<Utc>) -> Result<Transition> {
        let Some(stamp) = Self::timestamp_column(target) else {
            let current = self.load(call_id).await?;
            return Err(CallError::InvalidTransition {
                call_id: call_id.to_string(),
                from: current.state,
                to: target,
            });
        };

        let sources: Vec<&str> = CallState::sources_for(target)
            .iter()
            .map(CallState::as_str)
            .collect();

        // 条件更新：只有处于合法源状态的行会被改写
        let updated = call::Entity::update_many()
            .col_expr(call::Column::State, Expr::value(target.as_str()))
            .col_expr(stamp, Expr::value(at))
            .filter(call::Column::CallId.eq(call_id))
            .filter(call::Column::State.is_in(sources))
            .exec(&*self.db)
            .await?;

        let call = self.load(call_id).await?;

        if updated.rows_affected > 0 {
            debug!(call_id = %call_id, state = %target, "Call state updated");
            return Ok(Transition { call, applied: true });
        }

        if call.state == target && call.state.is_terminal() {
            debug!(call_id = %call_id, "Call already ended");
            return Ok(Transition {
                call,
                applied: false,
            });
        }

        Err(CallError::InvalidTransition {
            call_id: call_id.to_string(),
            from: call.state,
            to: target,
        })
    }

    async fn get(&self, call_id: &str) -> Result<Option<Call>> {
        call::Entity::find_by_id(call_id.to_string())
            .one(&*self.db)
            .await?
            .map(Call::try_from)
            .transpose()
    }
}
