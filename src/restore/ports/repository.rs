//! Repository port for restore plan persistence.

use crate::restore::domain::{RestorePlan, RestorePlanId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for restore plan repository operations.
pub type RestorePlanRepositoryResult<T> = Result<T, RestorePlanRepositoryError>;

/// Restore plan persistence contract.
#[async_trait]
pub trait RestorePlanRepository: Send + Sync {
    /// Stores a new plan.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePlanRepositoryError::DuplicatePlan`] when the plan ID
    /// already exists.
    async fn store(&self, plan: &RestorePlan) -> RestorePlanRepositoryResult<()>;

    /// Persists changes to an existing plan, including soft deletion.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePlanRepositoryError::NotFound`] when the plan does
    /// not exist.
    async fn update(&self, plan: &RestorePlan) -> RestorePlanRepositoryResult<()>;

    /// Finds a plan by identifier, including soft-deleted plans.
    async fn find_by_id(&self, id: RestorePlanId)
    -> RestorePlanRepositoryResult<Option<RestorePlan>>;

    /// Lists live plans ordered by creation time.
    async fn list(&self) -> RestorePlanRepositoryResult<Vec<RestorePlan>>;
}

/// Errors returned by restore plan repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RestorePlanRepositoryError {
    /// A plan with the same identifier already exists.
    #[error("duplicate restore plan identifier: {0}")]
    DuplicatePlan(RestorePlanId),

    /// The plan was not found.
    #[error("restore plan not found: {0}")]
    NotFound(RestorePlanId),

    /// A stored row could not be turned back into a plan.
    #[error("invalid persisted restore plan {id}: {reason}")]
    InvalidPersistedData {
        /// Identifier of the offending row.
        id: RestorePlanId,
        /// Validation failure.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RestorePlanRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
