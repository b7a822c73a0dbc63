//! Resolution of the single active ReleasePlanAdmission for a plan.
//!
//! Resolution is recomputed from the store on every call; nothing is cached.

use release_store::{ListParams, ResourceStore, TypedStore};
use tracing::debug;

use crate::domain::{ReleaseError, ReleasePlan, ReleasePlanAdmission, Result, ORIGIN_FIELD};

/// Pick the active admission for `application` among `candidates`.
///
/// Candidates for other applications are ignored. More than one match is
/// ambiguous regardless of labels; a sole match that opted out is rejected.
pub fn select_active_admission(
    target: &str,
    application: &str,
    candidates: Vec<ReleasePlanAdmission>,
) -> Result<ReleasePlanAdmission> {
    let mut matching: Vec<ReleasePlanAdmission> = candidates
        .into_iter()
        .filter(|a| a.spec.application == application)
        .collect();

    if matching.len() > 1 {
        return Err(ReleaseError::MultipleAdmissions {
            target: target.to_string(),
            application: application.to_string(),
        });
    }

    match matching.pop() {
        None => Err(ReleaseError::NoAdmission {
            target: target.to_string(),
            application: application.to_string(),
        }),
        Some(admission) if admission.auto_release_disabled() => {
            Err(ReleaseError::AutoReleaseDisabled {
                name: admission.metadata.name,
            })
        }
        Some(admission) => Ok(admission),
    }
}

/// List the admissions in the plan's target that accept releases from the
/// plan's namespace, then select the active one.
pub async fn resolve_active_admission<S>(store: &S, plan: &ReleasePlan) -> Result<ReleasePlanAdmission>
where
    S: ResourceStore + ?Sized,
{
    let params = ListParams::default()
        .in_namespace(plan.spec.target.as_str())
        .matching_field(ORIGIN_FIELD, plan.metadata.namespace.as_str());
    let candidates: Vec<ReleasePlanAdmission> = store.list(&params).await?;

    debug!(
        plan = %plan.metadata.name,
        target = %plan.spec.target,
        candidates = candidates.len(),
        "resolving release plan admission"
    );

    select_active_admission(&plan.spec.target, &plan.spec.application, candidates)
}
