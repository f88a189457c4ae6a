mod converter;
pub mod entity;

pub use entity::{device, user};

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

/// 创建用户表与设备表（已存在则跳过）
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut users = schema.create_table_from_entity(user::Entity);
    users.if_not_exists();
    db.execute(backend.build(&users)).await?;

    let mut devices = schema.create_table_from_entity(device::Entity);
    devices.if_not_exists();
    db.execute(backend.build(&devices)).await?;

    Ok(())
}
