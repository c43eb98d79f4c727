//! In-memory restore plan repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::restore::{
    domain::{RestorePlan, RestorePlanId},
    ports::{RestorePlanRepository, RestorePlanRepositoryError, RestorePlanRepositoryResult},
};

/// Thread-safe in-memory restore plan repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRestorePlanRepository {
    state: Arc<RwLock<HashMap<RestorePlanId, RestorePlan>>>,
}

impl InMemoryRestorePlanRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> RestorePlanRepositoryError {
    RestorePlanRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl RestorePlanRepository for InMemoryRestorePlanRepository {
    async fn store(&self, plan: &RestorePlan) -> RestorePlanRepositoryResult<()> {
        let mut plans = self.state.write().map_err(lock_error)?;
        if plans.contains_key(&plan.id()) {
            return Err(RestorePlanRepositoryError::DuplicatePlan(plan.id()));
        }
        plans.insert(plan.id(), plan.clone());
        Ok(())
    }

    async fn update(&self, plan: &RestorePlan) -> RestorePlanRepositoryResult<()> {
        let mut plans = self.state.write().map_err(lock_error)?;
        let stored = plans
            .get_mut(&plan.id())
            .ok_or(RestorePlanRepositoryError::NotFound(plan.id()))?;
        *stored = plan.clone();
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: RestorePlanId,
    ) -> RestorePlanRepositoryResult<Option<RestorePlan>> {
        let plans = self.state.read().map_err(lock_error)?;
        Ok(plans.get(&id).cloned())
    }

    async fn list(&self) -> RestorePlanRepositoryResult<Vec<RestorePlan>> {
        let plans = self.state.read().map_err(lock_error)?;
        let mut live: Vec<RestorePlan> = plans
            .values()
            .filter(|plan| !plan.is_deleted())
            .cloned()
            .collect();
        live.sort_by(|left, right| {
            left.created_at()
                .cmp(&right.created_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(live)
    }
}
