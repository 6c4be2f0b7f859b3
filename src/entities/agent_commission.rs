//! Agent commission entity - One agent's share within a commission breakdown.
//!
//! `position` preserves the listing-agent-first order of the computed breakdown.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Agent commission database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "agent_commissions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Breakdown this share belongs to
    pub breakdown_id: i64,
    /// Order within the breakdown (0 = first)
    pub position: i32,
    /// Agent receiving the amount
    pub agent_id: String,
    /// Amount owed to the agent
    pub amount: f64,
    /// `"LISTING"`, `"SELLING"` or `"BOTH"`
    pub role: String,
    /// Share of the total service fee, as a percentage
    pub percentage: f64,
}

/// Defines relationships between `AgentCommission` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each share belongs to one breakdown
    #[sea_orm(
        belongs_to = "super::commission_breakdown::Entity",
        from = "Column::BreakdownId",
        to = "super::commission_breakdown::Column::Id"
    )]
    CommissionBreakdown,
}

impl Related<super::commission_breakdown::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommissionBreakdown.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
