//! Replaces missing or null `file.jobId` with an empty string.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;

use crate::error::AppError;
use crate::migrations::traits::{MigrationStep, StepContext};
use crate::store::{Filter, Patch};
use crate::transform::TransformStats;

pub struct M001FileJobIdDefaults;

impl M001FileJobIdDefaults {
    async fn normalize(&self, ctx: &StepContext<'_>) -> Result<TransformStats, AppError> {
        ctx.transformer()
            .update_many(
                &ctx.collections.file,
                &Filter::is_null("jobId"),
                &Patch::new().set("jobId", json!("")),
            )
            .await
    }
}

impl MigrationStep for M001FileJobIdDefaults {
    fn id(&self) -> &'static str {
        "m001_file_job_id_defaults"
    }
    fn description(&self) -> &'static str {
        "Set missing or null file jobId to an empty string"
    }

    fn apply<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, Result<TransformStats, AppError>> {
        async move { self.normalize(ctx).await }.boxed()
    }
}
