mod converter;
pub mod entity;

pub use entity::{call, room};

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

/// 创建房间表与通话表（已存在则跳过）
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut rooms = schema.create_table_from_entity(room::Entity);
    rooms.if_not_exists();
    db.execute(backend.build(&rooms)).await?;

    let mut calls = schema.create_table_from_entity(call::Entity);
    calls.if_not_exists();
    db.execute(backend.build(&calls)).await?;

    Ok(())
}
