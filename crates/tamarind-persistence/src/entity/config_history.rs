//! Append-only change log of config entries

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "config_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub namespace: String,
    pub group_name: String,
    pub config_key: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
    pub config_type: String,
    pub version: i64,
    /// CREATE, UPDATE, DELETE or ROLLBACK
    pub op_type: String,
    pub operator: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
