//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod agent;
pub mod agent_commission;
pub mod commission_breakdown;
pub mod stage_history;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use agent::{Column as AgentColumn, Entity as Agent, Model as AgentModel};
pub use agent_commission::{
    Column as AgentCommissionColumn, Entity as AgentCommission, Model as AgentCommissionModel,
};
pub use commission_breakdown::{
    Column as CommissionBreakdownColumn, Entity as CommissionBreakdown,
    Model as CommissionBreakdownModel,
};
pub use stage_history::{
    Column as StageHistoryColumn, Entity as StageHistory, Model as StageHistoryModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
