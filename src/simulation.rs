//! Simulation harness.
//!
//! Each [`Scenario`] drives the real agent directory and transaction lifecycle against a
//! database and records what happened step by step. Happy-path scenarios succeed when the
//! computed commissions match the expected split; error scenarios succeed when the expected
//! error is produced. Alert counts mirror the `alerts` tracing events the lifecycle emits.

use crate::{
    core::{
        agent,
        stage::Stage,
        transaction::{self, NewTransaction, PropertyType},
    },
    entities,
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::{fmt, str::FromStr, time::Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Scripted scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Full lifecycle with one agent on both sides
    NormalSameAgent,
    /// Full lifecycle with distinct listing and selling agents
    NormalDifferentAgents,
    /// Full lifecycle with a fee above the large-amount threshold
    CriticalLargeAmount,
    /// Soft deleting an agent
    CriticalSoftDelete,
    /// Completed transactions reject any further transition
    CriticalCompleted,
    /// Skipping stages is rejected
    ErrorInvalidTransition,
    /// Referencing an unknown agent is rejected
    ErrorInvalidAgent,
    /// Re-entering the current stage is rejected
    ErrorSameStage,
    /// Ten transactions spread over five agents and several stages
    MultipleTransactions,
}

impl Scenario {
    /// Every scenario, in the order [`run_all_scenarios`] runs them.
    pub const ALL: [Self; 9] = [
        Self::NormalSameAgent,
        Self::NormalDifferentAgents,
        Self::CriticalLargeAmount,
        Self::CriticalSoftDelete,
        Self::CriticalCompleted,
        Self::ErrorInvalidTransition,
        Self::ErrorInvalidAgent,
        Self::ErrorSameStage,
        Self::MultipleTransactions,
    ];

    /// Command-line name of the scenario.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NormalSameAgent => "normal-same-agent",
            Self::NormalDifferentAgents => "normal-different-agents",
            Self::CriticalLargeAmount => "critical-large-amount",
            Self::CriticalSoftDelete => "critical-soft-delete",
            Self::CriticalCompleted => "critical-completed",
            Self::ErrorInvalidTransition => "error-invalid-transition",
            Self::ErrorInvalidAgent => "error-invalid-agent",
            Self::ErrorSameStage => "error-same-stage",
            Self::MultipleTransactions => "multiple-transactions",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("Unknown scenario: {s}")))
    }
}

/// One recorded step of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStep {
    /// Short machine-friendly step name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Whether the step did what the scenario expected
    pub success: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Error message, for failed steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the step raised an alert
    pub alert_triggered: bool,
}

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    /// Scenario that ran
    pub scenario: Scenario,
    /// Whether every expectation held
    pub success: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Recorded steps
    pub steps: Vec<ScenarioStep>,
    /// Number of alerts raised
    pub alert_count: usize,
    /// Number of failed expectations or unexpected errors
    pub error_count: usize,
}

/// Outcome of a full simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Number of scenarios run
    pub total_scenarios: usize,
    /// Scenarios that succeeded
    pub passed: usize,
    /// Scenarios that failed
    pub failed: usize,
    /// Alerts raised across all scenarios
    pub total_alerts: usize,
    /// Errors recorded across all scenarios
    pub total_errors: usize,
    /// Wall-clock duration in milliseconds
    pub total_duration_ms: u64,
    /// When the run started
    pub start_time: DateTime<Utc>,
    /// When the run ended
    pub end_time: DateTime<Utc>,
    /// Per-scenario results
    pub results: Vec<ScenarioResult>,
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Step recorder shared by the scenario bodies.
#[derive(Debug, Default)]
struct Run {
    steps: Vec<ScenarioStep>,
    alerts: usize,
    errors: usize,
}

impl Run {
    fn pass(&mut self, name: impl Into<String>, description: impl Into<String>, started: Instant) {
        self.push(name.into(), description.into(), started, None, 0);
    }

    fn alert(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        started: Instant,
        alerts: usize,
    ) {
        self.push(name.into(), description.into(), started, None, alerts);
    }

    fn fail(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        started: Instant,
        error: String,
    ) {
        self.errors += 1;
        self.push(name.into(), description.into(), started, Some(error), 0);
    }

    fn push(
        &mut self,
        name: String,
        description: String,
        started: Instant,
        error: Option<String>,
        alerts: usize,
    ) {
        self.alerts += alerts;
        self.steps.push(ScenarioStep {
            name,
            description,
            success: error.is_none(),
            duration_ms: elapsed_ms(started),
            error,
            alert_triggered: alerts > 0,
        });
    }

    /// Records whether `outcome` is the error `expected` describes.
    fn expect_error<T>(
        &mut self,
        name: &str,
        description: &str,
        started: Instant,
        outcome: Result<T>,
        expected: fn(&Error) -> bool,
    ) -> bool {
        match outcome {
            Err(err) if expected(&err) => {
                self.pass(name, format!("{description}: {err}"), started);
                true
            }
            Err(err) => {
                let error = format!("unexpected error: {err}");
                self.fail(name, description, started, error);
                false
            }
            Ok(_) => {
                let error = "operation was accepted".to_string();
                self.fail(name, description, started, error);
                false
            }
        }
    }

    /// Records whether a computed value matched expectations.
    fn check(&mut self, name: &str, description: &str, started: Instant, ok: bool) -> bool {
        if ok {
            self.pass(name, description, started);
        } else {
            self.fail(name, description, started, "validation failed".to_string());
        }
        ok
    }
}

async fn simulated_agent(
    db: &DatabaseConnection,
    run: &mut Run,
    label: &str,
) -> Result<entities::agent::Model> {
    let started = Instant::now();
    let slug = label.to_lowercase().replace(' ', "-");
    let email = format!("{slug}-{}@simulation.test", Uuid::new_v4().simple());
    let created = agent::create_agent(db, label, &email, "05550000000").await?;
    run.pass("create-agent", format!("Agent created: {label}"), started);
    Ok(created)
}

async fn simulated_transaction(
    db: &DatabaseConnection,
    run: &mut Run,
    property_id: &str,
    fee: f64,
    listing_agent_id: &str,
    selling_agent_id: &str,
) -> Result<transaction::Transaction> {
    let started = Instant::now();
    let created = transaction::create_transaction(
        db,
        NewTransaction {
            property_id: property_id.to_string(),
            property_type: PropertyType::Sale,
            total_service_fee: fee,
            listing_agent_id: listing_agent_id.to_string(),
            selling_agent_id: selling_agent_id.to_string(),
        },
    )
    .await?;
    let alerts = usize::from(transaction::raises_large_fee_alert(fee));
    run.alert(
        "create-transaction",
        format!("Transaction created for {property_id} with fee {fee}"),
        started,
        alerts,
    );
    Ok(created)
}

fn stage_notes(stage: Stage) -> &'static str {
    match stage {
        Stage::Agreement => "Agreement signed",
        Stage::EarnestMoney => "Earnest money paid",
        Stage::TitleDeed => "Title deed transferred",
        Stage::Completed => "Transaction completed",
    }
}

/// Moves a transaction forward until `target`, recording one step per transition.
async fn advance(
    db: &DatabaseConnection,
    run: &mut Run,
    transaction_id: &str,
    target: Stage,
) -> Result<transaction::Transaction> {
    let mut current = transaction::get_transaction(db, transaction_id).await?;
    while current.current_stage != target {
        let Some(&next) = current.current_stage.valid_next_stages().first() else {
            break;
        };
        let started = Instant::now();
        current = transaction::transition_stage(
            db,
            transaction_id,
            next,
            Some(stage_notes(next).to_string()),
        )
        .await?;

        let name = format!("update-stage-{next}");
        let description = format!("Stage updated: {next}");
        if next.is_terminal() {
            let large_fee = transaction::raises_large_fee_alert(current.total_service_fee);
            let alerts = 1 + usize::from(large_fee);
            run.alert(name, description, started, alerts);
        } else {
            run.pass(name, description, started);
        }
    }
    Ok(current)
}

async fn check_commission(
    db: &DatabaseConnection,
    run: &mut Run,
    transaction_id: &str,
    expected_agent_amounts: &[f64],
) -> Result<bool> {
    let started = Instant::now();
    let breakdown = transaction::get_commission_breakdown(db, transaction_id).await?;
    let fee = transaction::get_transaction(db, transaction_id)
        .await?
        .total_service_fee;

    let amounts: Vec<f64> = breakdown.agents.iter().map(|share| share.amount).collect();
    #[allow(clippy::float_cmp)]
    let valid = breakdown.agency_amount == fee * 0.5
        && amounts == expected_agent_amounts
        && breakdown.total() == fee;

    Ok(run.check(
        "validate-commission",
        &format!(
            "Commission checked: agency {} / agents {:?}",
            breakdown.agency_amount, amounts
        ),
        started,
        valid,
    ))
}

async fn normal_same_agent(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let agent = simulated_agent(db, run, "Simulation Agent").await?;
    let created =
        simulated_transaction(db, run, "prop-sim-1", 10000.0, &agent.id, &agent.id).await?;
    advance(db, run, &created.id, Stage::Completed).await?;
    check_commission(db, run, &created.id, &[5000.0]).await
}

async fn normal_different_agents(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let listing = simulated_agent(db, run, "Listing Agent").await?;
    let selling = simulated_agent(db, run, "Selling Agent").await?;
    let created =
        simulated_transaction(db, run, "prop-sim-2", 10000.0, &listing.id, &selling.id).await?;
    advance(db, run, &created.id, Stage::Completed).await?;
    check_commission(db, run, &created.id, &[2500.0, 2500.0]).await
}

async fn critical_large_amount(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let agent = simulated_agent(db, run, "High Value Agent").await?;
    let created =
        simulated_transaction(db, run, "prop-sim-3", 150_000.0, &agent.id, &agent.id).await?;
    advance(db, run, &created.id, Stage::Completed).await?;
    check_commission(db, run, &created.id, &[75000.0]).await
}

async fn critical_soft_delete(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let doomed = simulated_agent(db, run, "To Be Deleted Agent").await?;

    let started = Instant::now();
    agent::soft_delete_agent(db, &doomed.id).await?;
    run.alert("soft-delete-agent", "Agent soft deleted", started, 1);

    let started = Instant::now();
    let lookup = agent::find_agent_by_id(db, &doomed.id).await;
    Ok(run.expect_error(
        "lookup-deleted-agent",
        "Deleted agent is no longer found",
        started,
        lookup,
        |err| matches!(err, Error::AgentNotFound { .. }),
    ))
}

async fn critical_completed(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let agent = simulated_agent(db, run, "Completed Agent").await?;
    let created =
        simulated_transaction(db, run, "prop-sim-5", 20000.0, &agent.id, &agent.id).await?;
    let done = advance(db, run, &created.id, Stage::Completed).await?;

    let started = Instant::now();
    let stored = run.check(
        "breakdown-stored",
        "Commission breakdown stored on completion",
        started,
        done.commission_breakdown.is_some(),
    );

    let mut rejected = true;
    for stage in Stage::ALL {
        let started = Instant::now();
        let outcome = transaction::transition_stage(db, &created.id, stage, None).await;
        rejected &= run.expect_error(
            &format!("reject-{stage}"),
            &format!("Completed transaction cannot move to {stage}"),
            started,
            outcome,
            |err| matches!(err, Error::InvalidTransition { .. }),
        );
    }
    Ok(stored && rejected)
}

async fn error_invalid_transition(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let agent = simulated_agent(db, run, "Error Agent").await?;
    let created =
        simulated_transaction(db, run, "prop-sim-6", 10000.0, &agent.id, &agent.id).await?;

    let started = Instant::now();
    let outcome = transaction::transition_stage(db, &created.id, Stage::Completed, None).await;
    Ok(run.expect_error(
        "invalid-transition",
        "AGREEMENT -> COMPLETED rejected",
        started,
        outcome,
        |err| matches!(err, Error::InvalidTransition { .. }),
    ))
}

async fn error_invalid_agent(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let started = Instant::now();
    let ghost = Uuid::new_v4().to_string();
    let outcome = transaction::create_transaction(
        db,
        NewTransaction {
            property_id: "prop-sim-7".to_string(),
            property_type: PropertyType::Sale,
            total_service_fee: 10000.0,
            listing_agent_id: ghost.clone(),
            selling_agent_id: ghost,
        },
    )
    .await;
    Ok(run.expect_error(
        "invalid-agent",
        "Transaction with unknown agent rejected",
        started,
        outcome,
        |err| matches!(err, Error::AgentNotFound { .. }),
    ))
}

async fn error_same_stage(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let agent = simulated_agent(db, run, "Same Stage Agent").await?;
    let created =
        simulated_transaction(db, run, "prop-sim-8", 10000.0, &agent.id, &agent.id).await?;

    let started = Instant::now();
    let outcome = transaction::transition_stage(db, &created.id, Stage::Agreement, None).await;
    Ok(run.expect_error(
        "same-stage",
        "AGREEMENT -> AGREEMENT rejected",
        started,
        outcome,
        |err| matches!(err, Error::InvalidTransition { .. }),
    ))
}

async fn multiple_transactions(db: &DatabaseConnection, run: &mut Run) -> Result<bool> {
    let mut agent_ids = Vec::new();
    for i in 1..=5 {
        let created = simulated_agent(db, run, &format!("Multi Agent {i}")).await?;
        agent_ids.push(created.id);
    }

    let mut transaction_ids = Vec::new();
    for (index, step) in (0..10_usize).zip(0_u32..) {
        let fee = f64::from(step).mul_add(1000.0, 10000.0);
        let listing = &agent_ids[index % agent_ids.len()];
        let selling = &agent_ids[(index + 1) % agent_ids.len()];
        let created = simulated_transaction(
            db,
            run,
            &format!("prop-multi-{}", index + 1),
            fee,
            listing,
            selling,
        )
        .await?;
        transaction_ids.push((created.id, fee));
    }

    // First three stop at earnest money, next three at title deed, last four complete
    for (index, (id, _)) in transaction_ids.iter().enumerate() {
        let target = match index {
            0..=2 => Stage::EarnestMoney,
            3..=5 => Stage::TitleDeed,
            _ => Stage::Completed,
        };
        advance(db, run, id, target).await?;
    }

    let mut valid = true;
    for (id, fee) in &transaction_ids[6..] {
        let quarter = fee * 0.25;
        valid &= check_commission(db, run, id, &[quarter, quarter]).await?;
    }

    let started = Instant::now();
    let pending = transaction::get_commission_breakdown(db, &transaction_ids[0].0).await;
    valid &= run.expect_error(
        "breakdown-before-completion",
        "Commission of an open transaction is refused",
        started,
        pending,
        |err| matches!(err, Error::NotCompleted { .. }),
    );
    Ok(valid)
}

/// Runs one scenario and records its outcome. Unexpected errors end the scenario and are
/// recorded as a failed step rather than returned.
pub async fn run_scenario(db: &DatabaseConnection, scenario: Scenario) -> ScenarioResult {
    info!(%scenario, "Starting simulation");
    let started = Instant::now();
    let mut run = Run::default();

    let outcome = match scenario {
        Scenario::NormalSameAgent => normal_same_agent(db, &mut run).await,
        Scenario::NormalDifferentAgents => normal_different_agents(db, &mut run).await,
        Scenario::CriticalLargeAmount => critical_large_amount(db, &mut run).await,
        Scenario::CriticalSoftDelete => critical_soft_delete(db, &mut run).await,
        Scenario::CriticalCompleted => critical_completed(db, &mut run).await,
        Scenario::ErrorInvalidTransition => error_invalid_transition(db, &mut run).await,
        Scenario::ErrorInvalidAgent => error_invalid_agent(db, &mut run).await,
        Scenario::ErrorSameStage => error_same_stage(db, &mut run).await,
        Scenario::MultipleTransactions => multiple_transactions(db, &mut run).await,
    };

    let success = match outcome {
        Ok(valid) => valid && run.errors == 0,
        Err(err) => {
            error!(%scenario, error = %err, "Simulation failed");
            run.fail("error", "Unexpected error", Instant::now(), err.to_string());
            false
        }
    };

    let result = ScenarioResult {
        scenario,
        success,
        duration_ms: elapsed_ms(started),
        steps: run.steps,
        alert_count: run.alerts,
        error_count: run.errors,
    };

    if result.success {
        info!(
            %scenario,
            duration_ms = result.duration_ms,
            alerts = result.alert_count,
            "Simulation completed"
        );
    } else {
        warn!(%scenario, errors = result.error_count, "Simulation completed with failures");
    }
    result
}

/// Runs every scenario in order and summarizes the results.
pub async fn run_all_scenarios(db: &DatabaseConnection) -> SimulationReport {
    run_scenarios(db, &Scenario::ALL).await
}

/// Runs the given scenarios in order and summarizes the results.
pub async fn run_scenarios(db: &DatabaseConnection, scenarios: &[Scenario]) -> SimulationReport {
    let start_time = Utc::now();
    let started = Instant::now();

    let mut results = Vec::with_capacity(scenarios.len());
    for &scenario in scenarios {
        results.push(run_scenario(db, scenario).await);
    }

    let passed = results.iter().filter(|result| result.success).count();
    let report = SimulationReport {
        total_scenarios: results.len(),
        passed,
        failed: results.len() - passed,
        total_alerts: results.iter().map(|result| result.alert_count).sum(),
        total_errors: results.iter().map(|result| result.error_count).sum(),
        total_duration_ms: elapsed_ms(started),
        start_time,
        end_time: Utc::now(),
        results,
    };

    info!(
        total = report.total_scenarios,
        passed = report.passed,
        failed = report.failed,
        alerts = report.total_alerts,
        "All simulation scenarios completed"
    );
    report
}
