//! Shared test utilities for `RealtyLedger`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        agent,
        stage::Stage,
        transaction::{self, NewTransaction, PropertyType, Transaction},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test agent whose name and email are derived from `key`.
///
/// # Defaults
/// * `name`: `"Agent {key}"`
/// * `email`: `"{key}@example.com"`
/// * `phone`: `"05550000000"`
pub async fn create_test_agent(
    db: &DatabaseConnection,
    key: &str,
) -> Result<entities::agent::Model> {
    let name = format!("Agent {key}");
    let email = format!("{key}@example.com");
    agent::create_agent(db, &name, &email, "05550000000").await
}

/// Creates a `SALE` transaction on `prop-test` with the given agents and fee.
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    listing_agent_id: &str,
    selling_agent_id: &str,
    total_service_fee: f64,
) -> Result<Transaction> {
    transaction::create_transaction(
        db,
        NewTransaction {
            property_id: "prop-test".to_string(),
            property_type: PropertyType::Sale,
            total_service_fee,
            listing_agent_id: listing_agent_id.to_string(),
            selling_agent_id: selling_agent_id.to_string(),
        },
    )
    .await
}

/// Walks a transaction forward one stage at a time until it reaches `target`.
pub async fn advance_to(
    db: &DatabaseConnection,
    transaction_id: &str,
    target: Stage,
) -> Result<Transaction> {
    let mut current = transaction::get_transaction(db, transaction_id).await?;
    while current.current_stage != target {
        let Some(&next) = current.current_stage.valid_next_stages().first() else {
            break;
        };
        current = transaction::transition_stage(db, transaction_id, next, None).await?;
    }
    Ok(current)
}

/// Sets up a database with two distinct agents.
/// Returns (db, `listing_agent`, `selling_agent`).
pub async fn setup_with_agents() -> Result<(
    DatabaseConnection,
    entities::agent::Model,
    entities::agent::Model,
)> {
    let db = setup_test_db().await?;
    let listing = create_test_agent(&db, "listing").await?;
    let selling = create_test_agent(&db, "selling").await?;
    Ok((db, listing, selling))
}
