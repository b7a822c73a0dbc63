//! Shared fixtures: a seeded in-memory store and helpers to drive it.

#![allow(dead_code)]

use std::sync::Arc;

use release_core::domain::{set_condition, SUCCEEDED_CONDITION};
use release_core::{
    Application, Component, Condition, ConditionStatus, EnterpriseContractPolicy, Environment,
    PipelineRun, Reconciler, Release, ReleaseAdapter, ReleasePlan, ReleasePlanAdmission,
    ReleaseStrategy, Snapshot, SnapshotEnvironmentBinding, StoreSnapshotSyncer,
};
use release_store::fakes::MemoryResourceStore;
use release_store::{ListParams, NamespacedName, Precondition, ResourceStore, TypedStore};

pub const TENANT: &str = "tenant";
pub const MANAGED: &str = "managed";
pub const APPLICATION: &str = "app";
pub const PLAN: &str = "plan";
pub const ADMISSION: &str = "rpa";
pub const STRATEGY: &str = "strategy";
pub const POLICY: &str = "policy";
pub const SNAPSHOT: &str = "snap";
pub const ENVIRONMENT: &str = "prod";

pub struct Fixture {
    pub store: Arc<MemoryResourceStore>,
}

impl Fixture {
    /// Store seeded with a plan, one enabled admission without environment,
    /// and everything the release pipeline and deployment need.
    pub async fn new() -> Self {
        Self::seeded(admission()).await
    }

    /// Like [`Fixture::new`], with the admission deploying into `prod`.
    pub async fn with_environment() -> Self {
        Self::seeded(admission().with_environment(ENVIRONMENT)).await
    }

    /// Seeded store without any admission.
    pub async fn without_admission() -> Self {
        let fixture = Self {
            store: Arc::new(MemoryResourceStore::new()),
        };
        fixture.seed_common().await;
        fixture
    }

    async fn seeded(mut admission: ReleasePlanAdmission) -> Self {
        let fixture = Self::without_admission().await;
        fixture.store.create(&mut admission).await.unwrap();
        fixture
    }

    async fn seed_common(&self) {
        let store = &self.store;
        store
            .create(&mut ReleasePlan::new(TENANT, PLAN, APPLICATION, MANAGED))
            .await
            .unwrap();
        store
            .create(&mut ReleaseStrategy::new(MANAGED, STRATEGY, "release-pipeline", POLICY))
            .await
            .unwrap();
        store
            .create(&mut EnterpriseContractPolicy::new(MANAGED, POLICY))
            .await
            .unwrap();
        store
            .create(
                &mut Snapshot::new(TENANT, SNAPSHOT, APPLICATION)
                    .with_component("api", "quay.io/org/api@sha256:aaa")
                    .with_component("worker", "quay.io/org/worker@sha256:bbb"),
            )
            .await
            .unwrap();
        store
            .create(&mut Application::new(MANAGED, APPLICATION))
            .await
            .unwrap();
        for name in ["api", "worker"] {
            store
                .create(&mut Component::new(MANAGED, name, APPLICATION))
                .await
                .unwrap();
        }
        store
            .create(&mut Environment::new(MANAGED, ENVIRONMENT))
            .await
            .unwrap();
    }

    pub fn dyn_store(&self) -> Arc<dyn ResourceStore> {
        self.store.clone()
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::with_store(self.dyn_store())
    }

    pub fn adapter(&self, release: Release) -> ReleaseAdapter {
        let store = self.dyn_store();
        let syncer = Arc::new(StoreSnapshotSyncer::new(store.clone()));
        ReleaseAdapter::new(release, store, syncer)
    }

    pub async fn create_release(&self, name: &str) -> Release {
        let mut release = Release::new(TENANT, name, PLAN, SNAPSHOT);
        self.store.create(&mut release).await.unwrap();
        release
    }

    pub async fn release(&self, name: &str) -> Release {
        self.store
            .get(&NamespacedName::new(TENANT, name))
            .await
            .unwrap()
    }

    /// Write `mutate` into the stored Release's status, as another writer would.
    pub async fn patch_release_status(&self, name: &str, mutate: impl FnOnce(&mut Release)) -> Release {
        let mut release = self.release(name).await;
        let precondition = Precondition::merge_from(&release);
        mutate(&mut release);
        self.store
            .patch_status(&mut release, precondition)
            .await
            .unwrap();
        release
    }

    pub async fn add_admission(&self, mut admission: ReleasePlanAdmission) {
        self.store.create(&mut admission).await.unwrap();
    }

    pub async fn pipeline_runs(&self) -> Vec<PipelineRun> {
        self.store.list(&ListParams::default()).await.unwrap()
    }

    pub async fn bindings(&self) -> Vec<SnapshotEnvironmentBinding> {
        self.store.list(&ListParams::default()).await.unwrap()
    }

    /// Report a terminal Succeeded condition on every pipeline run.
    pub async fn finish_pipeline_runs(&self, status: ConditionStatus, message: &str) {
        for mut run in self.pipeline_runs().await {
            let precondition = Precondition::merge_from(&run);
            set_condition(
                &mut run.status.conditions,
                Condition::new(SUCCEEDED_CONDITION, status, "Completed", message),
            );
            self.store.patch_status(&mut run, precondition).await.unwrap();
        }
    }

    /// Report the aggregate deployment condition on every binding.
    pub async fn report_deployment(&self, status: ConditionStatus, reason: &str, message: &str) {
        for mut binding in self.bindings().await {
            let precondition = Precondition::merge_from(&binding);
            set_condition(
                &mut binding.status.component_deployment_conditions,
                Condition::new(
                    release_core::domain::ALL_COMPONENTS_DEPLOYED,
                    status,
                    reason,
                    message,
                ),
            );
            self.store
                .patch_status(&mut binding, precondition)
                .await
                .unwrap();
        }
    }
}

pub fn admission() -> ReleasePlanAdmission {
    ReleasePlanAdmission::new(MANAGED, ADMISSION, APPLICATION, TENANT, STRATEGY)
}

pub fn key(name: &str) -> NamespacedName {
    NamespacedName::new(TENANT, name)
}
