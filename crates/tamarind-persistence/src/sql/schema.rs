//! Schema bootstrap for the SQL backend
//!
//! Tables are derived from the SeaORM entities so the DDL matches whatever
//! backend the connection speaks (PostgreSQL, MySQL or SQLite).

use chrono::Utc;
use sea_orm::*;
use tamarind_common::DEFAULT_NAMESPACE;

use crate::entity::{
    config_history, config_info, namespace_info, token_blacklist, token_usage, users,
};

/// Create any missing tables and seed the default namespace
pub async fn create_tables(db: &DatabaseConnection) -> anyhow::Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let statements = vec![
        schema.create_table_from_entity(namespace_info::Entity),
        schema.create_table_from_entity(config_info::Entity),
        schema.create_table_from_entity(config_history::Entity),
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(token_blacklist::Entity),
        schema.create_table_from_entity(token_usage::Entity),
    ];

    for mut statement in statements {
        db.execute(backend.build(statement.if_not_exists())).await?;
    }

    let seeded = namespace_info::Entity::find_by_id(DEFAULT_NAMESPACE)
        .one(db)
        .await?
        .is_some();
    if !seeded {
        namespace_info::ActiveModel {
            name: Set(DEFAULT_NAMESPACE.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;
        tracing::info!("Seeded default namespace '{}'", DEFAULT_NAMESPACE);
    }

    Ok(())
}
