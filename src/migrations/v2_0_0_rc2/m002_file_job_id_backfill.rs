//! Backfills `file.jobId` from the jobs that reference each file.
//!
//! A job references files through `output[].uid`, `stdout.uid` and
//! `stderr.uid`. Jobs are scanned first; the file updates run after the scan.
//!
//! A file referenced by several jobs is assigned the job whose id sorts first,
//! so the result does not depend on scan order.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt};
use serde_json::json;

use crate::error::AppError;
use crate::migrations::decode_error;
use crate::migrations::traits::{MigrationStep, StepContext};
use crate::models::JobFileRefs;
use crate::store::{Filter, Patch, Projection};
use crate::transform::TransformStats;

pub struct M002FileJobIdBackfill;

impl M002FileJobIdBackfill {
    /// Maps each job id to the file uids it claims, ordered by job id.
    async fn collect_job_files(
        &self,
        ctx: &StepContext<'_>,
    ) -> Result<Vec<(String, Vec<i64>)>, AppError> {
        let jobs = &ctx.collections.job;
        let mut stream = ctx
            .store
            .find(
                jobs,
                &Filter::all(),
                &Projection::include(["id", "output", "stdout", "stderr"]),
            )
            .await
            .map_err(|e| AppError::scan(jobs, e))?;

        let mut claims: BTreeMap<i64, String> = BTreeMap::new();
        while let Some(doc) = stream.try_next().await.map_err(|e| AppError::scan(jobs, e))? {
            let refs: JobFileRefs = doc.decode().map_err(|e| decode_error(jobs, &doc, e))?;
            let Some(job_id) = refs.id.as_deref() else {
                tracing::debug!(collection = %jobs, "Skipping job without id");
                continue;
            };
            let uids = refs.file_uids();
            tracing::debug!(job = %job_id, files = ?uids, "Job file references");
            for uid in uids {
                match claims.entry(uid) {
                    Entry::Vacant(entry) => {
                        entry.insert(job_id.to_string());
                    }
                    Entry::Occupied(mut entry) => {
                        tracing::warn!(
                            file_uid = uid,
                            jobs = ?[entry.get().as_str(), job_id],
                            "File referenced by more than one job"
                        );
                        if job_id < entry.get().as_str() {
                            entry.insert(job_id.to_string());
                        }
                    }
                }
            }
        }

        let mut job_files: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        for (uid, job_id) in claims {
            job_files.entry(job_id).or_default().push(uid);
        }
        Ok(job_files.into_iter().collect())
    }

    async fn backfill(&self, ctx: &StepContext<'_>) -> Result<TransformStats, AppError> {
        let job_files = self.collect_job_files(ctx).await?;
        tracing::info!(jobs = job_files.len(), "Collected job file references");

        let transformer = ctx.transformer();
        let mut stats = TransformStats::default();
        for (job_id, uids) in job_files {
            stats += transformer
                .update_many(
                    &ctx.collections.file,
                    &Filter::is_in("uid", uids),
                    &Patch::new().set("jobId", json!(job_id)),
                )
                .await?;
        }
        Ok(stats)
    }
}

impl MigrationStep for M002FileJobIdBackfill {
    fn id(&self) -> &'static str {
        "m002_file_job_id_backfill"
    }
    fn description(&self) -> &'static str {
        "Set file jobId to the id of the job that produced the file"
    }

    fn apply<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, Result<TransformStats, AppError>> {
        async move { self.backfill(ctx).await }.boxed()
    }
}
