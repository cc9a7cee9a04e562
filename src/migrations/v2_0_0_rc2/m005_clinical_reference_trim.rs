//! Strips the embedded family and proband of clinical analyses down to
//! identity references.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::migrations::traits::{MigrationStep, StepContext};
use crate::models::{FamilyReference, MemberReference};
use crate::store::{Document, Filter, Patch, Projection};
use crate::transform::{BulkWriter, TransformStats};

type Trim = fn(&JsonValue) -> Result<JsonValue, serde_json::Error>;

pub struct M005ClinicalReferenceTrim;

impl MigrationStep for M005ClinicalReferenceTrim {
    fn id(&self) -> &'static str {
        "m005_clinical_reference_trim"
    }
    fn description(&self) -> &'static str {
        "Reduce clinical family, members, proband and samples to references"
    }

    fn apply<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, Result<TransformStats, AppError>> {
        async move {
            ctx.transformer()
                .transform(
                    &ctx.collections.clinical,
                    &Filter::all(),
                    &Projection::include(["proband", "family"]),
                    &trim_references,
                )
                .await
        }
        .boxed()
    }
}

/// Queues the trimmed `family` and `proband` when they differ from the stored ones.
fn trim_references(bulk: &mut BulkWriter, doc: Document) -> Result<(), AppError> {
    let id = doc.id()?;
    let fields: [(&str, Trim); 2] = [
        ("family", FamilyReference::trim),
        ("proband", MemberReference::trim),
    ];

    let mut patch = Patch::new();
    for (field, trim) in fields {
        let Some(value) = doc.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let trimmed = trim(value).map_err(|e| AppError::Decode {
            collection: bulk.collection().to_string(),
            id: id.to_string(),
            message: format!("{}: {}", field, e),
        })?;
        if trimmed != *value {
            patch.insert(field, trimmed);
        }
    }

    if !patch.is_empty() {
        bulk.update_one(id, patch)?;
    }
    Ok(())
}
