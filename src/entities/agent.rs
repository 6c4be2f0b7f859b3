//! Agent entity - Represents the brokerage's agents.
//!
//! Each agent has a name, a unique email and a phone number. Agents are never physically
//! removed; `is_deleted` hides them from every lookup while keeping the row for transactions
//! that still reference it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Agent database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "agents")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier (UUID v4 string)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Full name of the agent
    pub name: String,
    /// Contact email, unique across all agents including deleted ones
    #[sea_orm(unique)]
    pub email: String,
    /// Contact phone number
    pub phone: String,
    /// Soft delete flag - if true, agent is hidden but data is preserved
    pub is_deleted: bool,
    /// When the agent was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the agent was created
    pub created_at: DateTimeUtc,
    /// When the agent was last modified
    pub updated_at: DateTimeUtc,
}

/// Agents are referenced by transactions through two separate columns, so the
/// relations are declared on the transaction side only.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
