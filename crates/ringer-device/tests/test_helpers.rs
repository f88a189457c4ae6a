use ringer_device::{setup_schema, DeviceRegistry};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::sync::Arc;

/// 创建测试用的内存 SQLite 数据库
pub async fn create_test_db() -> Result<DatabaseConnection, DbErr> {
    // 内存库必须只有一个连接，否则每个连接看到的是不同的库
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await?;
    setup_schema(&db).await?;
    Ok(db)
}

pub async fn create_registry() -> DeviceRegistry {
    let db = create_test_db().await.expect("Failed to create test database");
    DeviceRegistry::new(Arc::new(db))
}
