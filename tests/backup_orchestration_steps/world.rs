//! Shared world state for backup orchestration BDD scenarios.

use chrono::{DateTime, TimeZone, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use strongroom::backup::adapters::memory::InMemoryBackupPolicyRepository;
use strongroom::backup::domain::{BackupPolicy, HostAddress};
use strongroom::config::OrchestratorConfig;
use strongroom::executor::adapters::InMemoryHypervisorGateway;
use strongroom::executor::services::RunHandle;
use strongroom::host::InMemoryHostDirectory;
use strongroom::orchestrator::{CreatedPolicy, Orchestrator, OrchestratorParts, OrchestratorResult};
use strongroom::restore::adapters::memory::InMemoryRestorePlanRepository;
use strongroom::restore::domain::RestorePlan;
use strongroom::run::adapters::memory::InMemoryRunRepository;
use strongroom::run::domain::Run;

/// Orchestrator type used by the BDD world.
pub type TestOrchestrator = Orchestrator<
    InMemoryBackupPolicyRepository,
    InMemoryRestorePlanRepository,
    InMemoryRunRepository,
    InMemoryHostDirectory,
    InMemoryHypervisorGateway,
    DefaultClock,
>;

/// Host every scenario policy targets.
pub const HOST: &str = "10.0.0.5";

/// Scenario world for backup orchestration behaviour tests.
pub struct BackupWorld {
    pub orchestrator: TestOrchestrator,
    pub gateway: InMemoryHypervisorGateway,
    pub runs: Arc<InMemoryRunRepository>,
    pub policy: Option<BackupPolicy>,
    pub plan: Option<RestorePlan>,
    pub successful_backup: Option<Run>,
    pub in_flight: Vec<RunHandle>,
    pub nightly_runs: Vec<Run>,
    pub triggered: usize,
    pub last_creation: Option<OrchestratorResult<CreatedPolicy>>,
    pub last_submission: Option<OrchestratorResult<RunHandle>>,
    pub last_restore: Option<Run>,
}

impl BackupWorld {
    /// Creates a world whose hypervisor completes jobs immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::with_gateway(InMemoryHypervisorGateway::new())
    }

    /// Creates a world around `gateway`.
    #[must_use]
    pub fn with_gateway(gateway: InMemoryHypervisorGateway) -> Self {
        let runs = Arc::new(InMemoryRunRepository::new());
        let host = HostAddress::new(HOST).expect("valid host");
        let orchestrator = Orchestrator::new(
            OrchestratorParts {
                policies: Arc::new(InMemoryBackupPolicyRepository::new()),
                plans: Arc::new(InMemoryRestorePlanRepository::new()),
                runs: Arc::clone(&runs),
                hosts: Arc::new(InMemoryHostDirectory::with_hosts([host])),
                gateway: Arc::new(gateway.clone()),
                clock: Arc::new(DefaultClock),
            },
            OrchestratorConfig::fast(),
        )
        .expect("valid configuration");

        Self {
            orchestrator,
            gateway,
            runs,
            policy: None,
            plan: None,
            successful_backup: None,
            in_flight: Vec::new(),
            nightly_runs: Vec::new(),
            triggered: 0,
            last_creation: None,
            last_submission: None,
            last_restore: None,
        }
    }

    /// Returns the policy created by an earlier step.
    pub fn policy(&self) -> Result<&BackupPolicy, eyre::Report> {
        self.policy
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing policy in scenario world"))
    }
}

impl Default for BackupWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> BackupWorld {
    BackupWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Returns a minute in October 2026.
pub fn at(day: u32, hour: u32, minute: u32) -> Result<DateTime<Utc>, eyre::Report> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, minute, 0)
        .single()
        .ok_or_else(|| eyre::eyre!("invalid scenario timestamp"))
}
