//! Transaction lifecycle business logic.
//!
//! This module creates transactions, moves them through the stage machine of
//! [`crate::core::stage`] and settles their commission with [`crate::core::commission`].
//! Every operation that writes more than one row runs inside a database transaction, and the
//! stage column is only ever changed by a conditional update on the stage that was read, so
//! two concurrent transitions from the same stage cannot both succeed.
//!
//! A commission breakdown is written at most once per transaction: when the transaction
//! first reaches `COMPLETED`, or lazily by [`get_commission_breakdown`] for a completed
//! transaction that has none. Nothing ever replaces a stored breakdown.

use crate::{
    core::{
        agent,
        commission::{self, AgentRole, CommissionBreakdown, CommissionInput},
        stage::{self, Stage},
    },
    entities::{self, agent_commission, commission_breakdown, stage_history, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Notes attached to the first history entry of every transaction.
pub const INITIAL_STAGE_NOTES: &str = "Transaction created";
/// Fees strictly above this amount raise an alert on creation and completion.
pub const LARGE_FEE_ALERT_THRESHOLD: f64 = 100_000.0;
/// Page size used by [`list_transactions`] when none is given.
pub const DEFAULT_PAGE_LIMIT: u64 = 10;
/// Largest page size [`list_transactions`] accepts.
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Kind of deal the transaction is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    /// Property is being sold
    Sale,
    /// Property is being rented out
    Rent,
}

impl PropertyType {
    /// Stored and serialized name of the property type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Rent => "RENT",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SALE" => Ok(Self::Sale),
            "RENT" => Ok(Self::Rent),
            other => Err(Error::invalid_input(format!(
                "Unknown property type: {other}"
            ))),
        }
    }
}

/// One entry of a transaction's stage history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHistoryEntry {
    /// Stage entered
    pub stage: Stage,
    /// When the stage was entered
    pub timestamp: DateTime<Utc>,
    /// Notes supplied with the transition
    pub notes: Option<String>,
}

/// A transaction together with its stage history and (once completed) its commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier
    pub id: String,
    /// External identifier of the property
    pub property_id: String,
    /// Sale or rent
    pub property_type: PropertyType,
    /// Total fee the brokerage charges the client
    pub total_service_fee: f64,
    /// Agent who listed the property
    pub listing_agent_id: String,
    /// Agent who brought the buyer or tenant
    pub selling_agent_id: String,
    /// Current lifecycle position
    pub current_stage: Stage,
    /// Stages entered so far, oldest first
    pub stage_history: Vec<StageHistoryEntry>,
    /// Present once the transaction is completed
    pub commission_breakdown: Option<CommissionBreakdown>,
    /// When the transaction was created
    pub created_at: DateTime<Utc>,
    /// When the transaction was last modified
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Fee and agent assignment as seen by the commission calculator.
    #[must_use]
    pub fn commission_input(&self) -> CommissionInput<'_> {
        CommissionInput::new(
            self.total_service_fee,
            &self.listing_agent_id,
            &self.selling_agent_id,
        )
    }
}

/// Everything needed to open a new transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// External identifier of the property
    pub property_id: String,
    /// Sale or rent
    pub property_type: PropertyType,
    /// Total fee the brokerage charges the client, must be zero or more
    pub total_service_fee: f64,
    /// Agent who listed the property
    pub listing_agent_id: String,
    /// Agent who brought the buyer or tenant, may equal the listing agent
    pub selling_agent_id: String,
}

/// Descriptive changes to an open transaction. `None` leaves a field untouched.
///
/// The property itself and the stage cannot be changed through an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    /// New total service fee
    pub total_service_fee: Option<f64>,
    /// New listing agent
    pub listing_agent_id: Option<String>,
    /// New selling agent
    pub selling_agent_id: Option<String>,
}

/// Filter and pagination for [`list_transactions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    /// Only transactions currently at this stage
    pub stage: Option<Stage>,
    /// Only transactions of this property type
    pub property_type: Option<PropertyType>,
    /// 1-based page number, defaults to 1
    pub page: Option<u64>,
    /// Page size, defaults to [`DEFAULT_PAGE_LIMIT`]
    pub limit: Option<u64>,
}

fn validate_fee(fee: f64) -> Result<()> {
    if !fee.is_finite() || fee < 0.0 {
        return Err(Error::invalid_input(format!(
            "totalServiceFee must be a non-negative number, got {fee}"
        )));
    }
    Ok(())
}

fn parse_column<T: FromStr>(value: &str, column: &str) -> Result<T> {
    value.parse().map_err(|_| {
        Error::Database(DbErr::Type(format!(
            "Unexpected value {value:?} in column {column}"
        )))
    })
}

/// Whether a transaction with this fee raises the large-amount alert on creation and completion.
#[must_use]
pub const fn raises_large_fee_alert(fee: f64) -> bool {
    fee > LARGE_FEE_ALERT_THRESHOLD
}

fn alert_if_large_fee(transaction_id: &str, fee: f64) {
    if raises_large_fee_alert(fee) {
        warn!(
            target: "alerts",
            transaction_id,
            total_service_fee = fee,
            "Large amount transaction"
        );
    }
}

async fn find_active_model<C>(db: &C, transaction_id: &str) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    entities::Transaction::find_by_id(transaction_id.to_string())
        .filter(transaction::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            id: transaction_id.to_string(),
        })
}

async fn load_history<C>(db: &C, transaction_id: &str) -> Result<Vec<StageHistoryEntry>>
where
    C: ConnectionTrait,
{
    entities::StageHistory::find()
        .filter(stage_history::Column::TransactionId.eq(transaction_id))
        .order_by_asc(stage_history::Column::Sequence)
        .all(db)
        .await?
        .into_iter()
        .map(|entry| {
            Ok(StageHistoryEntry {
                stage: parse_column(&entry.stage, "stage_history.stage")?,
                timestamp: entry.timestamp,
                notes: entry.notes,
            })
        })
        .collect()
}

async fn load_breakdown<C>(db: &C, transaction_id: &str) -> Result<Option<CommissionBreakdown>>
where
    C: ConnectionTrait,
{
    let Some(stored) = entities::CommissionBreakdown::find()
        .filter(commission_breakdown::Column::TransactionId.eq(transaction_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let agents = entities::AgentCommission::find()
        .filter(agent_commission::Column::BreakdownId.eq(stored.id))
        .order_by_asc(agent_commission::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(|share| {
            Ok(commission::AgentCommission {
                role: parse_column::<AgentRole>(&share.role, "agent_commissions.role")?,
                agent_id: share.agent_id,
                amount: share.amount,
                percentage: share.percentage,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(CommissionBreakdown {
        agency_amount: stored.agency_amount,
        agents,
        calculated_at: stored.calculated_at,
    }))
}

async fn store_breakdown<C>(
    db: &C,
    transaction_id: &str,
    breakdown: &CommissionBreakdown,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let stored = commission_breakdown::ActiveModel {
        transaction_id: Set(transaction_id.to_string()),
        agency_amount: Set(breakdown.agency_amount),
        calculated_at: Set(breakdown.calculated_at),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for (position, share) in (0..).zip(&breakdown.agents) {
        agent_commission::ActiveModel {
            breakdown_id: Set(stored.id),
            position: Set(position),
            agent_id: Set(share.agent_id.clone()),
            amount: Set(share.amount),
            role: Set(share.role.as_str().to_string()),
            percentage: Set(share.percentage),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn assemble<C>(db: &C, model: transaction::Model) -> Result<Transaction>
where
    C: ConnectionTrait,
{
    let stage_history = load_history(db, &model.id).await?;
    let commission_breakdown = load_breakdown(db, &model.id).await?;

    Ok(Transaction {
        property_type: parse_column(&model.property_type, "transactions.property_type")?,
        current_stage: parse_column(&model.current_stage, "transactions.current_stage")?,
        id: model.id,
        property_id: model.property_id,
        total_service_fee: model.total_service_fee,
        listing_agent_id: model.listing_agent_id,
        selling_agent_id: model.selling_agent_id,
        stage_history,
        commission_breakdown,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// Moves the stored stage from `expected` to `next`, but only if it still is `expected`.
///
/// Fails with [`Error::StaleStage`] when another writer changed the stage in between.
pub(crate) async fn advance_stage_if_current<C>(
    db: &C,
    transaction_id: &str,
    expected: Stage,
    next: Stage,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let next_stage = Expr::value(next.as_str());
    let result = entities::Transaction::update_many()
        .col_expr(transaction::Column::CurrentStage, next_stage)
        .col_expr(transaction::Column::UpdatedAt, Expr::value(now))
        .filter(transaction::Column::Id.eq(transaction_id))
        .filter(transaction::Column::CurrentStage.eq(expected.as_str()))
        .filter(transaction::Column::IsDeleted.eq(false))
        .exec(db)
        .await?;

    if result.rows_affected != 1 {
        return Err(Error::StaleStage {
            id: transaction_id.to_string(),
            expected,
        });
    }
    Ok(())
}

/// Opens a new transaction at `AGREEMENT`.
///
/// Both agents must exist (and not be deleted). The transaction starts with a single history
/// entry and no commission breakdown.
#[instrument(skip(db))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    new: NewTransaction,
) -> Result<Transaction> {
    if new.property_id.trim().is_empty() {
        return Err(Error::invalid_input("propertyId cannot be empty"));
    }
    validate_fee(new.total_service_fee)?;

    let txn = db.begin().await?;

    agent::find_agent_by_id(&txn, &new.listing_agent_id).await?;
    agent::find_agent_by_id(&txn, &new.selling_agent_id).await?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    transaction::ActiveModel {
        id: Set(id.clone()),
        property_id: Set(new.property_id.trim().to_string()),
        property_type: Set(new.property_type.as_str().to_string()),
        total_service_fee: Set(new.total_service_fee),
        listing_agent_id: Set(new.listing_agent_id),
        selling_agent_id: Set(new.selling_agent_id),
        current_stage: Set(Stage::Agreement.as_str().to_string()),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    stage_history::ActiveModel {
        transaction_id: Set(id.clone()),
        sequence: Set(0),
        stage: Set(Stage::Agreement.as_str().to_string()),
        timestamp: Set(now),
        notes: Set(Some(INITIAL_STAGE_NOTES.to_string())),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(transaction_id = %id, "Transaction created");
    alert_if_large_fee(&id, new.total_service_fee);

    get_transaction(db, &id).await
}

/// Loads a transaction with its history and breakdown. Deleted transactions are not found.
pub async fn get_transaction<C>(db: &C, transaction_id: &str) -> Result<Transaction>
where
    C: ConnectionTrait,
{
    let model = find_active_model(db, transaction_id).await?;
    assemble(db, model).await
}

/// Lists non-deleted transactions, newest first, filtered and paginated by `query`.
pub async fn list_transactions(
    db: &DatabaseConnection,
    query: &TransactionQuery,
) -> Result<Vec<Transaction>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if page == 0 {
        return Err(Error::invalid_input("page must be at least 1"));
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(Error::invalid_input(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }

    let mut select = entities::Transaction::find().filter(transaction::Column::IsDeleted.eq(false));
    if let Some(stage) = query.stage {
        select = select.filter(transaction::Column::CurrentStage.eq(stage.as_str()));
    }
    if let Some(property_type) = query.property_type {
        select = select.filter(transaction::Column::PropertyType.eq(property_type.as_str()));
    }

    let offset = (page - 1)
        .checked_mul(limit)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| Error::invalid_input("page is out of range"))?;

    let models = select
        .order_by_desc(transaction::Column::CreatedAt)
        .order_by_asc(transaction::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;

    let mut transactions = Vec::with_capacity(models.len());
    for model in models {
        transactions.push(assemble(db, model).await?);
    }
    Ok(transactions)
}

/// Changes the fee and/or agents of a transaction that has not completed yet.
///
/// A completed transaction is frozen: its breakdown was computed from the values it had when
/// it completed.
#[instrument(skip(db))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    transaction_id: &str,
    update: TransactionUpdate,
) -> Result<Transaction> {
    let txn = db.begin().await?;
    let model = find_active_model(&txn, transaction_id).await?;

    let current: Stage = parse_column(&model.current_stage, "transactions.current_stage")?;
    if current.is_terminal() {
        return Err(Error::invalid_input(format!(
            "Transaction {transaction_id} is {current} and can no longer be modified"
        )));
    }

    let mut active: transaction::ActiveModel = model.into();
    if let Some(fee) = update.total_service_fee {
        validate_fee(fee)?;
        active.total_service_fee = Set(fee);
    }
    if let Some(listing_agent_id) = update.listing_agent_id {
        agent::find_agent_by_id(&txn, &listing_agent_id).await?;
        active.listing_agent_id = Set(listing_agent_id);
    }
    if let Some(selling_agent_id) = update.selling_agent_id {
        agent::find_agent_by_id(&txn, &selling_agent_id).await?;
        active.selling_agent_id = Set(selling_agent_id);
    }
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    get_transaction(db, transaction_id).await
}

/// Moves a transaction to `new_stage`.
///
/// The move must be the single legal successor of the current stage; otherwise the
/// [`Error::InvalidTransition`] from the validator is returned and nothing is written. On
/// reaching the terminal stage the commission is computed from the fee and agents the
/// transaction had before this call and stored with it, unless a breakdown already exists.
#[instrument(skip(db))]
pub async fn transition_stage(
    db: &DatabaseConnection,
    transaction_id: &str,
    new_stage: Stage,
    notes: Option<String>,
) -> Result<Transaction> {
    let txn = db.begin().await?;
    let model = find_active_model(&txn, transaction_id).await?;
    let current: Stage = parse_column(&model.current_stage, "transactions.current_stage")?;

    stage::validate_transition(current, new_stage)?;

    let sequence = entities::StageHistory::find()
        .filter(stage_history::Column::TransactionId.eq(transaction_id))
        .order_by_desc(stage_history::Column::Sequence)
        .one(&txn)
        .await?
        .map_or(0, |last| last.sequence + 1);
    let now = Utc::now();

    stage_history::ActiveModel {
        transaction_id: Set(transaction_id.to_string()),
        sequence: Set(sequence),
        stage: Set(new_stage.as_str().to_string()),
        timestamp: Set(now),
        notes: Set(notes),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    advance_stage_if_current(&txn, transaction_id, current, new_stage, now).await?;

    if new_stage.is_terminal() {
        if load_breakdown(&txn, transaction_id).await?.is_some() {
            debug!(transaction_id, "Keeping stored commission breakdown");
        } else {
            let input = CommissionInput::new(
                model.total_service_fee,
                &model.listing_agent_id,
                &model.selling_agent_id,
            );
            let breakdown = commission::calculate_commission(&input)?;
            store_breakdown(&txn, transaction_id, &breakdown).await?;
        }
    }

    txn.commit().await?;

    info!(transaction_id, from = %current, to = %new_stage, "Stage updated");
    if new_stage.is_terminal() {
        warn!(target: "alerts", transaction_id, "Transaction completed");
        alert_if_large_fee(transaction_id, model.total_service_fee);
    }

    get_transaction(db, transaction_id).await
}

/// Returns the commission breakdown of a completed transaction.
///
/// A stored breakdown is returned as is. A completed transaction without one gets it computed
/// and stored now; its stage is left untouched.
#[instrument(skip(db))]
pub async fn get_commission_breakdown(
    db: &DatabaseConnection,
    transaction_id: &str,
) -> Result<CommissionBreakdown> {
    let txn = db.begin().await?;
    let model = find_active_model(&txn, transaction_id).await?;
    let stage: Stage = parse_column(&model.current_stage, "transactions.current_stage")?;

    if stage.is_not_terminal() {
        return Err(Error::NotCompleted { stage });
    }

    if let Some(stored) = load_breakdown(&txn, transaction_id).await? {
        txn.commit().await?;
        return Ok(stored);
    }

    let input = CommissionInput::new(
        model.total_service_fee,
        &model.listing_agent_id,
        &model.selling_agent_id,
    );
    let breakdown = commission::calculate_commission(&input)?;
    store_breakdown(&txn, transaction_id, &breakdown).await?;
    txn.commit().await?;

    info!(transaction_id, "Commission breakdown computed lazily");
    Ok(breakdown)
}

/// Marks a transaction as deleted. It disappears from every lookup but is kept in storage.
#[instrument(skip(db))]
pub async fn soft_delete_transaction(db: &DatabaseConnection, transaction_id: &str) -> Result<()> {
    let model = find_active_model(db, transaction_id).await?;
    let now = Utc::now();

    let mut active: transaction::ActiveModel = model.into();
    active.is_deleted = Set(true);
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(db).await?;

    warn!(target: "alerts", transaction_id, "Transaction soft deleted");
    Ok(())
}
