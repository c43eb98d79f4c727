//! Service layer for the restore plan catalog.

mod catalog;

pub use catalog::{
    CreateRestorePlanRequest, RestorePlanCatalogError, RestorePlanCatalogResult,
    RestorePlanService,
};
