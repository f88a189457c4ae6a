use crate::db::{device, user};
use crate::{
    summarize_token, Device, DeviceDirectory, DeviceError, DeviceRegistration, PushEnvironment,
    Result, TokenKind, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 设备注册表
///
/// 基于 sea-orm 的设备目录实现，注册在单个事务内完成，
/// 保证令牌迁移（从旧设备摘除再挂到新设备）不会被并发注册看到中间状态。
pub struct DeviceRegistry {
    db: Arc<DatabaseConnection>,
}

impl DeviceRegistry {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 按身份查询用户
    pub async fn find_user(&self, identity: &str) -> Result<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Identity.eq(identity))
            .one(&*self.db)
            .await?;
        Ok(model.map(User::from))
    }

    fn token_column(kind: TokenKind) -> device::Column {
        match kind {
            TokenKind::Apns => device::Column::ApnsToken,
            TokenKind::Voip => device::Column::VoipToken,
        }
    }

    async fn upsert_user_in<C: ConnectionTrait>(
        conn: &C,
        identity: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<user::Model> {
        let mut update_columns = vec![user::Column::UpdatedAt];
        if display_name.is_some() {
            update_columns.push(user::Column::DisplayName);
        }

        let active = user::ActiveModel {
            id: Set(format!("usr_{}", uuid::Uuid::new_v4().simple())),
            identity: Set(identity.to_string()),
            display_name: Set(display_name.map(str::to_string)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user::Entity::insert(active)
            .on_conflict(
                OnConflict::column(user::Column::Identity)
                    .update_columns(update_columns)
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        user::Entity::find()
            .filter(user::Column::Identity.eq(identity))
            .one(conn)
            .await?
            .ok_or_else(|| DeviceError::internal(format!("user {} vanished after upsert", identity)))
    }

    fn new_device(
        owner: &user::Model,
        registration: &DeviceRegistration,
        apns_token: Option<&str>,
        voip_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> device::ActiveModel {
        device::ActiveModel {
            id: Set(format!("dev_{}", uuid::Uuid::new_v4().simple())),
            user_id: Set(owner.id.clone()),
            identity: Set(owner.identity.clone()),
            platform: Set(registration.platform.clone()),
            env: Set(registration.env.as_str().to_string()),
            apns_token: Set(apns_token.map(str::to_string)),
            voip_token: Set(voip_token.map(str::to_string)),
            supports_callkit: Set(registration.supports_callkit),
            last_seen: Set(now),
            created_at: Set(now),
        }
    }

    /// 把已有设备行改挂到本次注册的用户名下
    fn reassign(
        model: device::Model,
        owner: &user::Model,
        registration: &DeviceRegistration,
        now: DateTime<Utc>,
    ) -> device::ActiveModel {
        let mut active: device::ActiveModel = model.into();
        active.user_id = Set(owner.id.clone());
        active.identity = Set(owner.identity.clone());
        active.platform = Set(registration.platform.clone());
        active.env = Set(registration.env.as_str().to_string());
        active.supports_callkit = Set(registration.supports_callkit);
        active.last_seen = Set(now);
        active
    }
}

#[async_trait]
impl DeviceDirectory for DeviceRegistry {
    async fn upsert_user(&self, identity: &str, display_name: Option<&str>) -> Result<User> {
        if identity.trim().is_empty() {
            return Err(DeviceError::validation("identity is required"));
        }
        let model = Self::upsert_user_in(&*self.db, identity, display_name, Utc::now()).await?;
        debug!(identity = %identity, user_id = %model.id, "User upserted");
        Ok(User::from(model))
    }

    async fn register(&self, registration: DeviceRegistration) -> Result<Device> {
        registration.validate()?;

        let apns_token = registration.apns_token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let voip_token = registration.voip_token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let owner = Self::upsert_user_in(
            &txn,
            &registration.identity,
            registration.display_name.as_deref(),
            now,
        )
        .await?;

        let mut current: Option<device::Model> = None;

        if let Some(token) = apns_token {
            let existing = device::Entity::find()
                .filter(device::Column::ApnsToken.eq(token))
                .one(&txn)
                .await?;

            // 不支持来电界面且本次没有带 VoIP 令牌时，清掉旧的交互式令牌
            let clear_voip = !registration.supports_callkit && voip_token.is_none();

            let model = match existing {
                Some(model) => {
                    let mut active = Self::reassign(model, &owner, &registration, now);
                    if clear_voip {
                        active.voip_token = Set(None);
                    }
                    active.update(&txn).await?
                }
                None => {
                    Self::new_device(&owner, &registration, Some(token), None, now)
                        .insert(&txn)
                        .await?
                }
            };
            current = Some(model);
        }

        if let Some(token) = voip_token {
            let model = match current.take() {
                Some(model) => {
                    device::Entity::update_many()
                        .col_expr(device::Column::VoipToken, Expr::value(Option::<String>::None))
                        .col_expr(device::Column::LastSeen, Expr::value(now))
                        .filter(device::Column::VoipToken.eq(token))
                        .filter(device::Column::Id.ne(model.id.clone()))
                        .exec(&txn)
                        .await?;

                    let mut active = Self::reassign(model, &owner, &registration, now);
                    active.voip_token = Set(Some(token.to_string()));
                    active.update(&txn).await?
                }
                None => {
                    let existing = device::Entity::find()
                        .filter(device::Column::VoipToken.eq(token))
                        .one(&txn)
                        .await?;
                    match existing {
                        Some(model) => {
                            Self::reassign(model, &owner, &registration, now)
                                .update(&txn)
                                .await?
                        }
                        None => {
                            Self::new_device(&owner, &registration, None, Some(token), now)
                                .insert(&txn)
                                .await?
                        }
                    }
                }
            };
            current = Some(model);
        }

        let model = current
            .ok_or_else(|| DeviceError::internal("registration produced no device row"))?;
        txn.commit().await?;

        info!(
            identity = %registration.identity,
            device_id = %model.id,
            platform = %model.platform,
            env = %model.env,
            supports_callkit = model.supports_callkit,
            apns = %summarize_token(model.apns_token.as_deref()),
            voip = %summarize_token(model.voip_token.as_deref()),
            "Device registered"
        );

        Ok(Device::from(model))
    }

    async fn list_reachable(&self, identity: &str) -> Result<Vec<Device>> {
        let models = device::Entity::find()
            .filter(device::Column::Identity.eq(identity))
            .filter(
                Condition::any()
                    .add(device::Column::ApnsToken.is_not_null())
                    .add(device::Column::VoipToken.is_not_null()),
            )
            .order_by_asc(device::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let devices: Vec<Device> = models
            .into_iter()
            .map(Device::from)
            .filter(Device::is_reachable)
            .collect();
        debug!(identity = %identity, count = devices.len(), "Listed reachable devices");
        Ok(devices)
    }

    async fn list_with_token(
        &self,
        kind: TokenKind,
        identity: Option<&str>,
        env: Option<PushEnvironment>,
    ) -> Result<Vec<Device>> {
        let mut query = device::Entity::find().filter(Self::token_column(kind).is_not_null());
        if let Some(identity) = identity {
            query = query.filter(device::Column::Identity.eq(identity));
        }
        if let Some(env) = env {
            query = query.filter(device::Column::Env.eq(env.as_str()));
        }

        let models = query
            .order_by_asc(device::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(models
            .into_iter()
            .map(Device::from)
            .filter(|d| d.token(kind).is_some())
            .collect())
    }

    async fn invalidate_token(&self, kind: TokenKind, token: &str) -> Result<u64> {
        let column = Self::token_column(kind);
        let result = device::Entity::update_many()
            .col_expr(column, Expr::value(Option::<String>::None))
            .filter(column.eq(token))
            .exec(&*self.db)
            .await?;

        info!(
            kind = %kind,
            token = %summarize_token(Some(token)),
            rows = result.rows_affected,
            "Device token invalidated"
        );
        Ok(result.rows_affected)
    }

    async fn delete_user(&self, identity: &str) -> Result<u64> {
        let txn = self.db.begin().await?;
        let Some(owner) = user::Entity::find()
            .filter(user::Column::Identity.eq(identity))
            .one(&txn)
            .await?
        else {
            return Ok(0);
        };

        let removed = device::Entity::delete_many()
            .filter(device::Column::UserId.eq(owner.id.clone()))
            .exec(&txn)
            .await?
            .rows_affected;
        user::Entity::delete_by_id(owner.id).exec(&txn).await?;
        txn.commit().await?;

        info!(identity = %identity, devices = removed, "User deleted");
        Ok(removed)
    }
}
