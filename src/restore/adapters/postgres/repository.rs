//! `PostgreSQL` repository implementation for restore plan storage.

use super::{models::RestorePlanRow, schema::restore_plans};
use crate::backup::domain::{BackupDomainError, BackupPolicyId, HostAddress, StorageRepositoryId};
use crate::postgres::{CatalogPgPool, get_conn_with, run_blocking_with};
use crate::restore::{
    domain::{PersistedRestorePlanData, RestoreOptions, RestorePlan, RestorePlanId},
    ports::{RestorePlanRepository, RestorePlanRepositoryError, RestorePlanRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL`-backed restore plan repository.
#[derive(Debug, Clone)]
pub struct PostgresRestorePlanRepository {
    pool: CatalogPgPool,
}

impl PostgresRestorePlanRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: CatalogPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> RestorePlanRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RestorePlanRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection =
                    get_conn_with(&pool, RestorePlanRepositoryError::persistence)?;
                f(&mut connection)
            },
            RestorePlanRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl RestorePlanRepository for PostgresRestorePlanRepository {
    async fn store(&self, plan: &RestorePlan) -> RestorePlanRepositoryResult<()> {
        let plan_id = plan.id();
        let row = to_row(plan);

        self.run_blocking(move |connection| {
            diesel::insert_into(restore_plans::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RestorePlanRepositoryError::DuplicatePlan(plan_id)
                    }
                    _ => RestorePlanRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, plan: &RestorePlan) -> RestorePlanRepositoryResult<()> {
        let plan_id = plan.id();
        let row = to_row(plan);

        self.run_blocking(move |connection| {
            let updated = diesel::update(restore_plans::table.find(plan_id.into_inner()))
                .set(&row)
                .execute(connection)
                .map_err(RestorePlanRepositoryError::persistence)?;
            if updated == 0 {
                return Err(RestorePlanRepositoryError::NotFound(plan_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: RestorePlanId,
    ) -> RestorePlanRepositoryResult<Option<RestorePlan>> {
        self.run_blocking(move |connection| {
            let row = restore_plans::table
                .find(id.into_inner())
                .select(RestorePlanRow::as_select())
                .first::<RestorePlanRow>(connection)
                .optional()
                .map_err(RestorePlanRepositoryError::persistence)?;
            row.map(row_to_plan).transpose()
        })
        .await
    }

    async fn list(&self) -> RestorePlanRepositoryResult<Vec<RestorePlan>> {
        self.run_blocking(move |connection| {
            let rows = restore_plans::table
                .filter(restore_plans::deleted_at.is_null())
                .order((restore_plans::created_at.asc(), restore_plans::id.asc()))
                .select(RestorePlanRow::as_select())
                .load::<RestorePlanRow>(connection)
                .map_err(RestorePlanRepositoryError::persistence)?;
            rows.into_iter().map(row_to_plan).collect()
        })
        .await
    }
}

fn to_row(plan: &RestorePlan) -> RestorePlanRow {
    RestorePlanRow {
        id: plan.id().into_inner(),
        host: plan.host().as_str().to_owned(),
        storage_repository_id: plan.storage_repository_id().as_str().to_owned(),
        policy_id: plan.policy_id().into_inner(),
        preserve: plan.options().preserve,
        power_on_after_restore: plan.options().power_on_after_restore,
        created_at: plan.created_at(),
        updated_at: plan.updated_at(),
        deleted_at: plan.deleted_at(),
    }
}

fn row_to_plan(row: RestorePlanRow) -> RestorePlanRepositoryResult<RestorePlan> {
    let id = RestorePlanId::from_uuid(row.id);
    let invalid = |err: BackupDomainError| RestorePlanRepositoryError::InvalidPersistedData {
        id,
        reason: err.to_string(),
    };

    Ok(RestorePlan::from_persisted(PersistedRestorePlanData {
        id,
        host: HostAddress::new(row.host).map_err(invalid)?,
        storage_repository_id: StorageRepositoryId::new(row.storage_repository_id)
            .map_err(invalid)?,
        policy_id: BackupPolicyId::from_uuid(row.policy_id),
        options: RestoreOptions {
            preserve: row.preserve,
            power_on_after_restore: row.power_on_after_restore,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
        deleted_at: row.deleted_at,
    }))
}
