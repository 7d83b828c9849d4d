//! Drives one scenario setup run.
//!
//! The road network step and the admin-bounds step run concurrently on the
//! same task. Either failing aborts the other; the whole run is bounded by
//! a deadline.

use std::future::Future;
use std::time::Duration;

use ram_database::operations::create_operation;
use ram_database_models::OperationStatus;

use crate::SetupError;
use crate::context::{SetupContext, SetupServices};
use crate::road_network::RoadNetworkOutcome;
use crate::{admin_bounds, road_network};

/// Name of the persisted operation for a setup run.
pub const OPERATION_NAME: &str = "project-setup-finish";

/// Sets up one scenario with the default admin-bounds step.
///
/// # Errors
///
/// Returns the first [`SetupError`] of either step, or
/// [`SetupError::Timeout`] if the run outlives `timeout`.
pub async fn run_setup(
    services: SetupServices,
    project_id: i64,
    scenario_id: i64,
    timeout: Duration,
) -> Result<RoadNetworkOutcome, SetupError> {
    let operation_id = services
        .db
        .run(move |conn| create_operation(conn, OPERATION_NAME, project_id, scenario_id))
        .await?;
    let ctx = SetupContext::new(services, project_id, scenario_id, operation_id);

    log::info!("p{project_id} s{scenario_id}: setup started (operation {operation_id})");

    run_steps(&ctx, admin_bounds::process(&ctx), timeout).await
}

/// Runs the road network step alongside `admin_bounds` under `timeout`,
/// recording the result in the run's operation log.
///
/// # Errors
///
/// See [`run_setup`].
pub async fn run_steps<A>(
    ctx: &SetupContext,
    admin_bounds: A,
    timeout: Duration,
) -> Result<RoadNetworkOutcome, SetupError>
where
    A: Future<Output = Result<(), SetupError>>,
{
    let (project_id, scenario_id) = (ctx.project_id, ctx.scenario_id);

    let steps = async { tokio::try_join!(road_network::import(ctx), admin_bounds) };

    let result = match tokio::time::timeout(timeout, steps).await {
        Ok(Ok((outcome, ()))) => Ok(outcome),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(SetupError::Timeout {
            project_id,
            scenario_id,
            timeout,
        }),
    };

    match &result {
        Ok(outcome) => {
            log::info!(
                "p{project_id} s{scenario_id}: setup complete ({} bytes, editing {})",
                outcome.size_bytes,
                outcome.active_editing
            );
            ctx.op.log("success", "Setup complete").await?;
            ctx.op.finish(OperationStatus::Complete).await?;
        }
        Err(e) => {
            log::error!("p{project_id} s{scenario_id}: setup failed: {e}");
            let recorded = match ctx.op.log("error", &e.to_string()).await {
                Ok(()) => ctx.op.finish(OperationStatus::Failed).await,
                Err(log_err) => Err(log_err),
            };
            if let Err(log_err) = recorded {
                log::warn!("p{project_id} s{scenario_id}: could not record failure: {log_err}");
            }
        }
    }

    result
}
