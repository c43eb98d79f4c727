//! `PostgreSQL` repository implementation for run storage.

use super::{models::RunRow, schema::runs};
use crate::backup::domain::BackupPolicyId;
use crate::postgres::{CatalogPgPool, get_conn_with, run_blocking_with};
use crate::restore::domain::RestorePlanId;
use crate::run::{
    domain::{PersistedRunData, Run, RunId, RunKind, RunStatus, RunTarget, TriggerKind},
    ports::{RunRepository, RunRepositoryError, RunRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

const BACKUP_KIND: &str = "backup";
const RESTORE_KIND: &str = "restore";

/// `PostgreSQL`-backed run repository.
#[derive(Debug, Clone)]
pub struct PostgresRunRepository {
    pool: CatalogPgPool,
}

impl PostgresRunRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: CatalogPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> RunRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RunRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection = get_conn_with(&pool, RunRepositoryError::persistence)?;
                f(&mut connection)
            },
            RunRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl RunRepository for PostgresRunRepository {
    async fn store(&self, run: &Run) -> RunRepositoryResult<()> {
        let run_id = run.id();
        let row = to_row(run);

        self.run_blocking(move |connection| {
            diesel::insert_into(runs::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RunRepositoryError::DuplicateRun(run_id)
                    }
                    _ => RunRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, run: &Run) -> RunRepositoryResult<()> {
        let run_id = run.id();
        let row = to_row(run);

        self.run_blocking(move |connection| {
            // The status guard makes the terminal check and the write one
            // statement.
            let updated = diesel::update(
                runs::table.filter(runs::id.eq(run_id.into_inner())).filter(
                    runs::status.eq_any([
                        RunStatus::Pending.as_str(),
                        RunStatus::Running.as_str(),
                    ]),
                ),
            )
            .set(&row)
            .execute(connection)
            .map_err(RunRepositoryError::persistence)?;
            if updated > 0 {
                return Ok(());
            }
            if run_exists(connection, run_id)? {
                return Err(RunRepositoryError::TerminalRunImmutable(run_id));
            }
            Err(RunRepositoryError::NotFound(run_id))
        })
        .await
    }

    async fn find_by_id(&self, id: RunId) -> RunRepositoryResult<Option<Run>> {
        self.run_blocking(move |connection| {
            let row = runs::table
                .find(id.into_inner())
                .select(RunRow::as_select())
                .first::<RunRow>(connection)
                .optional()
                .map_err(RunRepositoryError::persistence)?;
            row.map(row_to_run).transpose()
        })
        .await
    }

    async fn list_for_target(&self, target: RunTarget) -> RunRepositoryResult<Vec<Run>> {
        self.run_blocking(move |connection| {
            let query = runs::table
                .select(RunRow::as_select())
                .order((runs::started_at.asc(), runs::id.asc()))
                .into_boxed();
            let filtered = match target {
                RunTarget::Policy(policy_id) => query
                    .filter(runs::kind.eq(BACKUP_KIND))
                    .filter(runs::policy_id.eq(policy_id.into_inner())),
                RunTarget::Plan(plan_id) => query
                    .filter(runs::kind.eq(RESTORE_KIND))
                    .filter(runs::plan_id.eq(plan_id.into_inner())),
            };
            let rows = filtered
                .load::<RunRow>(connection)
                .map_err(RunRepositoryError::persistence)?;
            rows.into_iter().map(row_to_run).collect()
        })
        .await
    }

    async fn list_successful_backups(
        &self,
        policy_id: BackupPolicyId,
    ) -> RunRepositoryResult<Vec<Run>> {
        self.run_blocking(move |connection| {
            let rows = runs::table
                .filter(runs::kind.eq(BACKUP_KIND))
                .filter(runs::policy_id.eq(policy_id.into_inner()))
                .filter(runs::status.eq(RunStatus::Success.as_str()))
                .order((
                    runs::completed_at.desc(),
                    runs::started_at.desc(),
                    runs::id.desc(),
                ))
                .select(RunRow::as_select())
                .load::<RunRow>(connection)
                .map_err(RunRepositoryError::persistence)?;
            rows.into_iter().map(row_to_run).collect()
        })
        .await
    }

    async fn list_by_status(&self, status: RunStatus) -> RunRepositoryResult<Vec<Run>> {
        self.run_blocking(move |connection| {
            let rows = runs::table
                .filter(runs::status.eq(status.as_str()))
                .order(runs::started_at.asc())
                .select(RunRow::as_select())
                .load::<RunRow>(connection)
                .map_err(RunRepositoryError::persistence)?;
            rows.into_iter().map(row_to_run).collect()
        })
        .await
    }

    async fn delete_backup(&self, id: RunId) -> RunRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let deleted = diesel::delete(
                runs::table
                    .filter(runs::id.eq(id.into_inner()))
                    .filter(runs::kind.eq(BACKUP_KIND))
                    .filter(runs::status.eq(RunStatus::Success.as_str())),
            )
            .execute(connection)
            .map_err(RunRepositoryError::persistence)?;
            if deleted > 0 {
                return Ok(());
            }
            if run_exists(connection, id)? {
                return Err(RunRepositoryError::NotPrunable(id));
            }
            Err(RunRepositoryError::NotFound(id))
        })
        .await
    }
}

fn run_exists(connection: &mut PgConnection, id: RunId) -> RunRepositoryResult<bool> {
    diesel::select(diesel::dsl::exists(runs::table.find(id.into_inner())))
        .get_result::<bool>(connection)
        .map_err(RunRepositoryError::persistence)
}

fn to_row(run: &Run) -> RunRow {
    let (policy_id, plan_id, source_run_id, backup_path) = match run.kind() {
        RunKind::Backup {
            policy_id,
            backup_path,
        } => (Some(policy_id.into_inner()), None, None, backup_path.clone()),
        RunKind::Restore {
            plan_id,
            source_run_id,
        } => (
            None,
            Some(plan_id.into_inner()),
            Some(source_run_id.into_inner()),
            None,
        ),
    };

    RunRow {
        id: run.id().into_inner(),
        kind: run.kind().as_str().to_owned(),
        policy_id,
        plan_id,
        source_run_id,
        backup_path,
        status: run.status().as_str().to_owned(),
        trigger_kind: run.trigger().as_str().to_owned(),
        started_at: run.started_at(),
        completed_at: run.completed_at(),
        output_message: run.output_message().to_owned(),
    }
}

fn row_to_run(row: RunRow) -> RunRepositoryResult<Run> {
    let id = RunId::from_uuid(row.id);
    let invalid = |reason: String| RunRepositoryError::InvalidPersistedData { id, reason };

    let kind = match (row.kind.as_str(), row.policy_id, row.plan_id, row.source_run_id) {
        (BACKUP_KIND, Some(policy_id), None, None) => RunKind::Backup {
            policy_id: BackupPolicyId::from_uuid(policy_id),
            backup_path: row.backup_path,
        },
        (RESTORE_KIND, None, Some(plan_id), Some(source_run_id)) => RunKind::Restore {
            plan_id: RestorePlanId::from_uuid(plan_id),
            source_run_id: RunId::from_uuid(source_run_id),
        },
        (other, ..) => {
            return Err(invalid(format!(
                "kind '{other}' does not match its owner columns"
            )));
        }
    };
    let status = RunStatus::try_from(row.status.as_str()).map_err(|err| invalid(err.to_string()))?;
    let trigger =
        TriggerKind::try_from(row.trigger_kind.as_str()).map_err(|err| invalid(err.to_string()))?;
    if status.is_terminal() != row.completed_at.is_some() {
        return Err(invalid(String::from(
            "completed_at must be set exactly when the run is terminal",
        )));
    }

    Ok(Run::from_persisted(PersistedRunData {
        id,
        kind,
        status,
        trigger,
        started_at: row.started_at,
        completed_at: row.completed_at,
        output_message: row.output_message,
    }))
}
