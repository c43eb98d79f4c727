//! Identifier and validated scalar types for the backup domain.

use super::BackupDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a backup policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupPolicyId(Uuid);

impl BackupPolicyId {
    /// Creates a new random policy identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a policy identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for BackupPolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BackupPolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trims a token and rejects empty or whitespace-bearing values.
fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return None;
    }
    Some(trimmed.to_owned())
}

/// Network address of a hypervisor host (IP or hostname).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostAddress(String);

impl HostAddress {
    /// Creates a validated host address.
    ///
    /// # Errors
    ///
    /// Returns [`BackupDomainError::InvalidHostAddress`] when the value is
    /// empty or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, BackupDomainError> {
        let raw = value.into();
        normalize_token(&raw)
            .map(Self)
            .ok_or(BackupDomainError::InvalidHostAddress(raw))
    }

    /// Returns the address as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hypervisor-side identifier of a storage repository (SR).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageRepositoryId(String);

impl StorageRepositoryId {
    /// Creates a validated storage repository identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BackupDomainError::InvalidStorageRepositoryId`] when the
    /// value is empty or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, BackupDomainError> {
        let raw = value.into();
        normalize_token(&raw)
            .map(Self)
            .ok_or(BackupDomainError::InvalidStorageRepositoryId(raw))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageRepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hypervisor-side identifier of a virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VmId(String);

impl VmId {
    /// Creates a validated VM identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BackupDomainError::InvalidVmId`] when the value is empty or
    /// contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, BackupDomainError> {
        let raw = value.into();
        normalize_token(&raw)
            .map(Self)
            .ok_or(BackupDomainError::InvalidVmId(raw))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
