//! Backfills the `id` of parent references in clinical analyses.
//!
//! Family members and the proband carry `father`/`mother` references that
//! may hold only a `uid`. Each one is resolved against the individual
//! collection and given the individual's `id`. The members' own `uid → id`
//! pairs are known up front and seed the per-document reference map.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::migrations::traits::{MigrationStep, StepContext};
use crate::models::{ParentReference, ParentRole};
use crate::store::{as_uid, Document, DocumentId, DocumentStore, Filter, JsonMap, Patch, Projection};
use crate::transform::{resolve, BulkWriter, DocumentTransform, ReferenceMap, TransformStats};

pub struct M003ClinicalMemberIds;

impl MigrationStep for M003ClinicalMemberIds {
    fn id(&self) -> &'static str {
        "m003_clinical_member_ids"
    }
    fn description(&self) -> &'static str {
        "Populate father/mother ids of clinical family members and probands"
    }

    fn apply<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, Result<TransformStats, AppError>> {
        async move {
            let backfill = ParentIdBackfill {
                individuals: &ctx.collections.individual,
            };
            ctx.transformer()
                .transform(
                    &ctx.collections.clinical,
                    &Filter::all(),
                    &Projection::include(["family", "proband"]),
                    &backfill,
                )
                .await
        }
        .boxed()
    }
}

/// Per-document callback resolving parent references.
struct ParentIdBackfill<'c> {
    individuals: &'c str,
}

impl DocumentTransform for ParentIdBackfill<'_> {
    fn apply<'a>(
        &'a self,
        store: &'a dyn DocumentStore,
        bulk: &'a mut BulkWriter,
        doc: Document,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        async move { self.backfill(store, bulk, doc).await }.boxed()
    }
}

impl ParentIdBackfill<'_> {
    async fn backfill(
        &self,
        store: &dyn DocumentStore,
        bulk: &mut BulkWriter,
        doc: Document,
    ) -> Result<(), AppError> {
        let id = doc.id()?;
        let mut cache = ReferenceMap::new();
        let mut patch = Patch::new();

        if let Some(JsonValue::Object(family)) = doc.get("family") {
            let mut family = family.clone();
            let mut changed = false;
            if let Some(JsonValue::Array(members)) = family.get_mut("members") {
                seed_members(&mut cache, members.as_slice());
                for member in members.iter_mut() {
                    if let JsonValue::Object(member) = member {
                        changed |= self
                            .resolve_parents(store, &mut cache, member, bulk.collection(), &id)
                            .await?;
                    }
                }
            }
            if changed {
                patch.insert("family", JsonValue::Object(family));
            }
        }

        if let Some(JsonValue::Object(proband)) = doc.get("proband") {
            let mut proband = proband.clone();
            if self
                .resolve_parents(store, &mut cache, &mut proband, bulk.collection(), &id)
                .await?
            {
                patch.insert("proband", JsonValue::Object(proband));
            }
        }

        if !patch.is_empty() {
            bulk.update_one(id, patch)?;
        }
        Ok(())
    }

    /// Sets the `id` of each parent reference that resolves. Returns true if
    /// the member changed.
    async fn resolve_parents(
        &self,
        store: &dyn DocumentStore,
        cache: &mut ReferenceMap,
        member: &mut JsonMap,
        collection: &str,
        doc_id: &DocumentId,
    ) -> Result<bool, AppError> {
        let mut changed = false;

        for role in ParentRole::ALL {
            let Some(value) = member.get(role.field()).filter(|v| v.is_object()).cloned() else {
                continue;
            };
            let mut parent: ParentReference =
                serde_json::from_value(value).map_err(|e| AppError::Decode {
                    collection: collection.to_string(),
                    id: doc_id.to_string(),
                    message: format!("{}: {}", role.field(), e),
                })?;

            let Some(uid) = parent.uid() else {
                if parent.uid.as_ref().is_some_and(|v| !v.is_null()) {
                    tracing::warn!(collection, id = %doc_id, role = role.field(), "Parent uid is not numeric");
                }
                continue;
            };

            match resolve(cache, store, self.individuals, uid).await? {
                Some(resolved) => {
                    if parent.set_id(&resolved) {
                        let value = serde_json::to_value(&parent)
                            .map_err(|e| AppError::Internal(format!("Failed to encode parent: {}", e)))?;
                        member.insert(role.field().to_string(), value);
                        changed = true;
                    }
                }
                None => {
                    tracing::warn!(
                        collection,
                        id = %doc_id,
                        uid,
                        role = role.field(),
                        "Parent not found, leaving reference untouched"
                    );
                }
            }
        }

        Ok(changed)
    }
}

/// Seeds the map with the members' own `uid → id` pairs.
///
/// Members without a string `id` are not seeded, so their uid is looked up.
fn seed_members(cache: &mut ReferenceMap, members: &[JsonValue]) {
    for member in members {
        let uid = member.get("uid").and_then(as_uid);
        let id = member.get("id").and_then(|v| v.as_str());
        if let (Some(uid), Some(id)) = (uid, id) {
            cache.seed(uid, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_members_skips_members_without_ids() {
        let members = vec![
            json!({"uid": 7, "id": "IND7"}),
            json!({"uid": 8}),
            json!({"uid": 9, "id": null}),
            json!(null),
        ];
        let mut cache = ReferenceMap::new();

        seed_members(&mut cache, &members);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(7), Some(&Some("IND7".to_string())));
        assert!(cache.get(8).is_none());
    }
}
