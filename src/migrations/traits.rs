//! Migration step trait and registry.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::CollectionNames;
use crate::error::AppError;
use crate::store::DocumentStore;
use crate::transform::{TransformStats, Transformer};

// =============================================================================
// Step Context
// =============================================================================

/// Everything a step may touch: the store, the collection names and the
/// execution mode.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub collections: &'a CollectionNames,
    pub dry_run: bool,
}

impl<'a> StepContext<'a> {
    pub fn new(store: &'a dyn DocumentStore, collections: &'a CollectionNames) -> Self {
        Self {
            store,
            collections,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// A transformer over the context's store, honoring dry runs.
    pub fn transformer(&self) -> Transformer<'a> {
        Transformer::new(self.store).dry_run(self.dry_run)
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub id: String,
    pub stats: TransformStats,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StepReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

// =============================================================================
// Step Trait
// =============================================================================

/// One isolated unit of a catalog migration.
///
/// Uses BoxFuture to avoid `'static` requirements from `#[async_trait]`.
/// Steps must be idempotent: running a step twice modifies nothing the
/// second time.
pub trait MigrationStep: Send + Sync {
    fn id(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// Performs the step's writes.
    fn apply<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, Result<TransformStats, AppError>>;

    /// Applies the step and times it.
    fn run<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, Result<StepReport, AppError>> {
        async move {
            let started_at = Utc::now();
            let stats = self.apply(ctx).await?;
            Ok(StepReport {
                id: self.id().to_string(),
                stats,
                dry_run: ctx.dry_run,
                started_at,
                finished_at: Utc::now(),
            })
        }
        .boxed()
    }
}

// =============================================================================
// Step Registry
// =============================================================================

/// Steps in registration order.
pub struct Register {
    steps: Vec<Box<dyn MigrationStep>>,
}

impl Register {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn register(mut self, step: impl MigrationStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Iterate over steps.
    pub fn iter(&self) -> impl Iterator<Item = &dyn MigrationStep> {
        self.steps.iter().map(|s| s.as_ref())
    }

    pub fn get(&self, id: &str) -> Option<&dyn MigrationStep> {
        self.iter().find(|s| s.id() == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for Register {
    fn default() -> Self {
        Self::new()
    }
}
