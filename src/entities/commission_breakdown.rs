//! Commission breakdown entity - The settled split of a completed transaction's fee.
//!
//! `transaction_id` is unique: a breakdown is written once and never replaced.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Commission breakdown database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commission_breakdowns")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Transaction the breakdown was computed for
    #[sea_orm(unique)]
    pub transaction_id: String,
    /// Agency's share of the fee
    pub agency_amount: f64,
    /// When the breakdown was computed
    pub calculated_at: DateTimeUtc,
}

/// Defines relationships between `CommissionBreakdown` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each breakdown belongs to one transaction
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id"
    )]
    Transaction,
    /// One breakdown has one or two agent commissions
    #[sea_orm(has_many = "super::agent_commission::Entity")]
    AgentCommissions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::agent_commission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AgentCommissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
