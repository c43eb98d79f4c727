//! `PostgreSQL` repository implementation for backup policy storage.

use super::{
    models::{BackupPolicyRow, NewBackupPolicyRow},
    schema::backup_policies,
};
use crate::backup::{
    domain::{
        BackupDomainError, BackupPolicy, BackupPolicyId, CronSchedule, HostAddress,
        PersistedBackupPolicyData, Retention, StorageRepository, StorageRepositoryId,
        VirtualMachine, VmId,
    },
    ports::{BackupPolicyRepository, BackupPolicyRepositoryError, BackupPolicyRepositoryResult},
};
use crate::postgres::{CatalogPgPool, get_conn_with, run_blocking_with};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL`-backed backup policy repository.
#[derive(Debug, Clone)]
pub struct PostgresBackupPolicyRepository {
    pool: CatalogPgPool,
}

impl PostgresBackupPolicyRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: CatalogPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> BackupPolicyRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> BackupPolicyRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection =
                    get_conn_with(&pool, BackupPolicyRepositoryError::persistence)?;
                f(&mut connection)
            },
            BackupPolicyRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl BackupPolicyRepository for PostgresBackupPolicyRepository {
    async fn store(&self, policy: &BackupPolicy) -> BackupPolicyRepositoryResult<()> {
        let policy_id = policy.id();
        let new_row = to_row(policy);

        self.run_blocking(move |connection| {
            diesel::insert_into(backup_policies::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        BackupPolicyRepositoryError::DuplicatePolicy(policy_id)
                    }
                    _ => BackupPolicyRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, policy: &BackupPolicy) -> BackupPolicyRepositoryResult<()> {
        let policy_id = policy.id();
        let changes = to_row(policy);

        self.run_blocking(move |connection| {
            let updated = diesel::update(backup_policies::table.find(policy_id.into_inner()))
                .set(&changes)
                .execute(connection)
                .map_err(BackupPolicyRepositoryError::persistence)?;
            if updated == 0 {
                return Err(BackupPolicyRepositoryError::NotFound(policy_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: BackupPolicyId,
    ) -> BackupPolicyRepositoryResult<Option<BackupPolicy>> {
        self.run_blocking(move |connection| {
            let row = backup_policies::table
                .find(id.into_inner())
                .select(BackupPolicyRow::as_select())
                .first::<BackupPolicyRow>(connection)
                .optional()
                .map_err(BackupPolicyRepositoryError::persistence)?;
            row.map(row_to_policy).transpose()
        })
        .await
    }

    async fn list(
        &self,
        host: Option<&HostAddress>,
    ) -> BackupPolicyRepositoryResult<Vec<BackupPolicy>> {
        let host_filter = host.map(|address| address.as_str().to_owned());
        self.run_blocking(move |connection| {
            let mut query = backup_policies::table
                .filter(backup_policies::deleted_at.is_null())
                .select(BackupPolicyRow::as_select())
                .order((backup_policies::created_at.asc(), backup_policies::id.asc()))
                .into_boxed();
            if let Some(address) = host_filter {
                query = query.filter(backup_policies::host.eq(address));
            }
            let rows = query
                .load::<BackupPolicyRow>(connection)
                .map_err(BackupPolicyRepositoryError::persistence)?;
            rows.into_iter().map(row_to_policy).collect()
        })
        .await
    }
}

fn to_row(policy: &BackupPolicy) -> NewBackupPolicyRow {
    NewBackupPolicyRow {
        id: policy.id().into_inner(),
        name: policy.name().to_owned(),
        description: policy.description().to_owned(),
        storage_repository_id: policy.storage_repository().id.as_str().to_owned(),
        storage_repository_name: policy.storage_repository().name.clone(),
        vm_id: policy.vm().id.as_str().to_owned(),
        vm_name: policy.vm().name.clone(),
        host: policy.host().as_str().to_owned(),
        active: policy.is_active(),
        retention: i64::from(policy.retention()),
        cron_schedule: policy.schedule().as_str().to_owned(),
        created_at: policy.created_at(),
        updated_at: policy.updated_at(),
        deleted_at: policy.deleted_at(),
    }
}

fn row_to_policy(row: BackupPolicyRow) -> BackupPolicyRepositoryResult<BackupPolicy> {
    let id = BackupPolicyId::from_uuid(row.id);
    let invalid = |err: BackupDomainError| BackupPolicyRepositoryError::InvalidPersistedData {
        id,
        reason: err.to_string(),
    };

    let data = PersistedBackupPolicyData {
        id,
        name: row.name,
        description: row.description,
        storage_repository: StorageRepository {
            id: StorageRepositoryId::new(row.storage_repository_id).map_err(invalid)?,
            name: row.storage_repository_name,
        },
        vm: VirtualMachine {
            id: VmId::new(row.vm_id).map_err(invalid)?,
            name: row.vm_name,
        },
        host: HostAddress::new(row.host).map_err(invalid)?,
        active: row.active,
        retention: Retention::new(row.retention).map_err(invalid)?,
        schedule: CronSchedule::parse(row.cron_schedule).map_err(invalid)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
        deleted_at: row.deleted_at,
    };
    Ok(BackupPolicy::from_persisted(data))
}
