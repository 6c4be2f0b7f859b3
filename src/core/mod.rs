/// Agent directory: create, look up, update and soft-delete agents
pub mod agent;
/// Commission calculation for completed transactions
pub mod commission;
/// Forward-only transaction stage machine
pub mod stage;
/// Transaction lifecycle: creation, stage transitions and commission settlement
pub mod transaction;
