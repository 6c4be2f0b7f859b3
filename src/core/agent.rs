//! Agent directory business logic.
//!
//! Creates, looks up, updates and soft-deletes agents. Transactions only ever reference
//! agents through [`find_agent_by_id`], which treats deleted agents as missing.

use crate::{
    config::seed::SeedConfig,
    entities::{Agent, agent},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Fields of an agent that may be changed after creation. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentUpdate {
    /// New name
    pub name: Option<String>,
    /// New email, must stay unique
    pub email: Option<String>,
    /// New phone number
    pub phone: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input(format!(
            "Agent {field} cannot be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(Error::invalid_input(format!(
            "Agent email is not valid: {email}"
        ))),
    }
}

async fn ensure_email_available<C>(db: &C, email: &str, except_id: Option<&str>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Agent::find().filter(agent::Column::Email.eq(email));
    if let Some(id) = except_id {
        query = query.filter(agent::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::DuplicateEmail {
            email: email.to_string(),
        });
    }
    Ok(())
}

/// Creates a new agent after validating and normalizing its fields.
///
/// Name and phone are trimmed and must not be empty; the email is lowercased and must be
/// unique across all agents, deleted ones included.
#[instrument(skip(db))]
pub async fn create_agent(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    phone: &str,
) -> Result<agent::Model> {
    let name = required("name", name)?;
    let phone = required("phone", phone)?;
    let email = normalize_email(email)?;

    ensure_email_available(db, &email, None).await?;

    let now = chrono::Utc::now();
    let agent = agent::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name),
        email: Set(email),
        phone: Set(phone),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let result = agent.insert(db).await?;
    info!(agent_id = %result.id, "Agent created");
    Ok(result)
}

/// Finds an active agent by id, returning None if it does not exist or was deleted.
pub async fn get_agent_by_id<C>(db: &C, agent_id: &str) -> Result<Option<agent::Model>>
where
    C: ConnectionTrait,
{
    Agent::find_by_id(agent_id.to_string())
        .filter(agent::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an active agent by id, failing with [`Error::AgentNotFound`] if there is none.
pub async fn find_agent_by_id<C>(db: &C, agent_id: &str) -> Result<agent::Model>
where
    C: ConnectionTrait,
{
    get_agent_by_id(db, agent_id)
        .await?
        .ok_or_else(|| Error::AgentNotFound {
            id: agent_id.to_string(),
        })
}

/// Retrieves all active agents, ordered alphabetically by name.
pub async fn get_all_active_agents(db: &DatabaseConnection) -> Result<Vec<agent::Model>> {
    Agent::find()
        .filter(agent::Column::IsDeleted.eq(false))
        .order_by_asc(agent::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies an [`AgentUpdate`] to an active agent.
#[instrument(skip(db))]
pub async fn update_agent(
    db: &DatabaseConnection,
    agent_id: &str,
    update: AgentUpdate,
) -> Result<agent::Model> {
    let existing = find_agent_by_id(db, agent_id).await?;
    let mut active: agent::ActiveModel = existing.into();

    if let Some(name) = update.name {
        active.name = Set(required("name", &name)?);
    }
    if let Some(phone) = update.phone {
        active.phone = Set(required("phone", &phone)?);
    }
    if let Some(email) = update.email {
        let email = normalize_email(&email)?;
        ensure_email_available(db, &email, Some(agent_id)).await?;
        active.email = Set(email);
    }
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Soft deletes an agent. The row is kept so existing transactions still resolve, but the
/// agent can no longer be found or assigned.
#[instrument(skip(db))]
pub async fn soft_delete_agent(db: &DatabaseConnection, agent_id: &str) -> Result<()> {
    let existing = find_agent_by_id(db, agent_id).await?;
    let now = chrono::Utc::now();

    let mut active: agent::ActiveModel = existing.into();
    active.is_deleted = Set(true);
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(db).await?;

    warn!(target: "alerts", agent_id, "Agent soft deleted");
    Ok(())
}

/// Inserts every configured agent whose email is not present yet.
///
/// Returns the number of agents created.
pub async fn seed_agents(db: &DatabaseConnection, config: &SeedConfig) -> Result<usize> {
    let mut created = 0;
    for seed in &config.agents {
        let email = normalize_email(&seed.email)?;
        let exists = Agent::find()
            .filter(agent::Column::Email.eq(email.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        create_agent(db, &seed.name, &email, &seed.phone).await?;
        created += 1;
    }
    info!("Seeded {} agent(s)", created);
    Ok(created)
}
