//! Transaction entity - Represents a real-estate deal moving through its lifecycle.
//!
//! `current_stage` and `property_type` are stored as their `SCREAMING_SNAKE_CASE` names.
//! The stage history and the commission breakdown live in their own tables
//! (`stage_history`, `commission_breakdowns`) and are assembled by
//! [`crate::core::transaction`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier (UUID v4 string)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// External identifier of the property
    pub property_id: String,
    /// `"SALE"` or `"RENT"`
    pub property_type: String,
    /// Total fee the brokerage charges the client
    pub total_service_fee: f64,
    /// Agent who listed the property
    pub listing_agent_id: String,
    /// Agent who brought the buyer or tenant
    pub selling_agent_id: String,
    /// One of `"AGREEMENT"`, `"EARNEST_MONEY"`, `"TITLE_DEED"`, `"COMPLETED"`
    pub current_stage: String,
    /// Soft delete flag
    pub is_deleted: bool,
    /// When the transaction was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the transaction was created
    pub created_at: DateTimeUtc,
    /// When the transaction was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Listing agent reference
    #[sea_orm(
        belongs_to = "super::agent::Entity",
        from = "Column::ListingAgentId",
        to = "super::agent::Column::Id"
    )]
    ListingAgent,
    /// Selling agent reference
    #[sea_orm(
        belongs_to = "super::agent::Entity",
        from = "Column::SellingAgentId",
        to = "super::agent::Column::Id"
    )]
    SellingAgent,
    /// One transaction has many stage history entries
    #[sea_orm(has_many = "super::stage_history::Entity")]
    StageHistory,
    /// One transaction has at most one commission breakdown
    #[sea_orm(has_one = "super::commission_breakdown::Entity")]
    CommissionBreakdown,
}

impl Related<super::stage_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StageHistory.def()
    }
}

impl Related<super::commission_breakdown::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommissionBreakdown.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
