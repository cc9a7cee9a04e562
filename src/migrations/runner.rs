//! Runs named migration steps in the order given.
//!
//! There is no version tracking: the operator names the steps, and each one
//! is idempotent, so re-running a step is always safe.

use crate::error::AppError;
use crate::migrations::traits::{MigrationStep, Register, StepContext, StepReport};

/// Runs the steps named by `ids`, in that order.
///
/// Every id is resolved before anything runs. The store is flushed after each
/// step. The first failing step aborts the run with an error naming it.
pub async fn run_steps<S: AsRef<str>>(
    register: &Register,
    ids: &[S],
    ctx: &StepContext<'_>,
) -> Result<Vec<StepReport>, AppError> {
    let steps = ids
        .iter()
        .map(|id| {
            register
                .get(id.as_ref())
                .ok_or_else(|| AppError::UnknownStep(id.as_ref().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    run(steps, ctx).await
}

/// Runs every registered step in registration order.
pub async fn run_all(register: &Register, ctx: &StepContext<'_>) -> Result<Vec<StepReport>, AppError> {
    run(register.iter().collect(), ctx).await
}

async fn run(
    steps: Vec<&dyn MigrationStep>,
    ctx: &StepContext<'_>,
) -> Result<Vec<StepReport>, AppError> {
    let mut reports: Vec<StepReport> = Vec::with_capacity(steps.len());

    for step in steps {
        tracing::info!(
            "Applying migration step {}{}: {}",
            step.id(),
            if ctx.dry_run { " (dry run)" } else { "" },
            step.description()
        );

        let outcome = match step.run(ctx).await {
            Ok(report) => ctx.store.flush().await.map(|()| report),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(report) => {
                tracing::info!(
                    step = step.id(),
                    visited = report.stats.visited,
                    queued = report.stats.queued,
                    matched = report.stats.matched,
                    modified = report.stats.modified,
                    elapsed_ms = report.elapsed().num_milliseconds(),
                    "Migration step finished"
                );
                reports.push(report);
            }
            Err(e) => {
                tracing::error!("Migration step {} failed: {}", step.id(), e);
                if !reports.is_empty() {
                    let done: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
                    tracing::warn!(completed = ?done, "Steps completed before the failure");
                }
                return Err(e.in_step(step.id()));
            }
        }
    }

    Ok(reports)
}
