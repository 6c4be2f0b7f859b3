//! Stage history entity - Append-only log of the stages a transaction went through.
//!
//! Rows are ordered by `sequence`, which starts at 0 for the `AGREEMENT` entry written at
//! creation and grows by one per successful transition.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stage history database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stage_history")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Transaction this entry belongs to
    pub transaction_id: String,
    /// Position of the entry within the transaction's history
    pub sequence: i32,
    /// Stage entered
    pub stage: String,
    /// When the stage was entered
    pub timestamp: DateTimeUtc,
    /// Optional free-form notes supplied with the transition
    pub notes: Option<String>,
}

/// Defines relationships between `StageHistory` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one transaction
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id"
    )]
    Transaction,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
