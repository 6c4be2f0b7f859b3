use realty_ledger::{
    config::{database, seed},
    core::agent,
    errors::Result,
    simulation::{self, Scenario},
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();

    // Optional first argument selects one scenario; default runs them all
    let scenarios = match env::args().nth(1) {
        Some(name) => vec![name.parse::<Scenario>().inspect_err(|e| error!("{}", e))?],
        None => Scenario::ALL.to_vec(),
    };

    let seed_config = seed::load_default_config()?;

    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    let seeded = agent::seed_agents(&db, &seed_config).await?;
    info!("Database ready, {} agent(s) seeded", seeded);

    let report = simulation::run_scenarios(&db, &scenarios).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed > 0 {
        error!("{} scenario(s) failed", report.failed);
        std::process::exit(1);
    }
    Ok(())
}
