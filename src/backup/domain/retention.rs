//! Retention count for successful backups.

use super::BackupDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of most recent successful backups a policy keeps.
///
/// Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Retention(u32);

impl Retention {
    /// Creates a validated retention count.
    ///
    /// # Errors
    ///
    /// Returns [`BackupDomainError::InvalidRetention`] when the value is below
    /// one or does not fit in 32 bits.
    pub fn new(value: i64) -> Result<Self, BackupDomainError> {
        match u32::try_from(value) {
            Ok(count) if count >= 1 => Ok(Self(count)),
            _ => Err(BackupDomainError::InvalidRetention(value)),
        }
    }

    /// Returns the retention count.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns the retention count as a slot count for slicing run lists.
    #[must_use]
    pub fn slots(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl TryFrom<i64> for Retention {
    type Error = BackupDomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Retention> for i64 {
    fn from(retention: Retention) -> Self {
        Self::from(retention.0)
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
