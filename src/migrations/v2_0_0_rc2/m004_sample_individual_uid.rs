//! Stores `sample._individualUid == -1` as a 64-bit integer.
//!
//! Some samples carry the "no individual" marker as a float (`-1.0`).
//! Numeric equality matches both forms; the patch writes the integer.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;

use crate::error::AppError;
use crate::migrations::traits::{MigrationStep, StepContext};
use crate::store::{Filter, Patch};
use crate::transform::TransformStats;

const NO_INDIVIDUAL: i64 = -1;

pub struct M004SampleIndividualUid;

impl M004SampleIndividualUid {
    async fn fix_type(&self, ctx: &StepContext<'_>) -> Result<TransformStats, AppError> {
        ctx.transformer()
            .update_many(
                &ctx.collections.sample,
                &Filter::eq("_individualUid", NO_INDIVIDUAL),
                &Patch::new().set("_individualUid", json!(NO_INDIVIDUAL)),
            )
            .await
    }
}

impl MigrationStep for M004SampleIndividualUid {
    fn id(&self) -> &'static str {
        "m004_sample_individual_uid"
    }
    fn description(&self) -> &'static str {
        "Store sample _individualUid -1 as a 64-bit integer"
    }

    fn apply<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, Result<TransformStats, AppError>> {
        async move { self.fix_type(ctx).await }.boxed()
    }
}
