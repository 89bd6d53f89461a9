//! Identity resolution
//!
//! The only authorization gate of the submission flow: raw e-mail input is
//! normalized and looked up in the manager directory.

use crate::directory::ManagerDirectory;
use crate::error::DirectoryError;
use crate::types::{ManagerProfile, NormalizedEmail};
use std::sync::Arc;

/// Result of resolving a manager e-mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Active manager found
    Authorized(ManagerProfile),
    /// Unknown, inactive, or blank e-mail
    Unauthorized,
}

impl Resolution {
    /// Check if the manager is authorized
    #[inline]
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    /// Authorized profile, if any
    #[inline]
    #[must_use]
    pub fn profile(&self) -> Option<&ManagerProfile> {
        match self {
            Self::Authorized(profile) => Some(profile),
            Self::Unauthorized => None,
        }
    }
}

/// Resolves raw manager e-mails against a directory
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn ManagerDirectory>,
}

impl IdentityResolver {
    /// Create resolver over a directory
    #[inline]
    #[must_use]
    pub fn new(directory: Arc<dyn ManagerDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve raw input
    ///
    /// # Errors
    /// Returns error if the directory backend fails
    pub async fn resolve(&self, raw_email: &str) -> Result<Resolution, DirectoryError> {
        let Some(email) = NormalizedEmail::new(raw_email) else {
            tracing::debug!("blank manager e-mail");
            return Ok(Resolution::Unauthorized);
        };
        match self.directory.lookup(&email).await? {
            Some(profile) => {
                tracing::debug!(email = %email, "manager authorized");
                Ok(Resolution::Authorized(profile))
            }
            None => {
                tracing::debug!(email = %email, "manager not found or inactive");
                Ok(Resolution::Unauthorized)
            }
        }
    }

    /// Underlying directory
    #[inline]
    #[must_use]
    pub fn directory(&self) -> &Arc<dyn ManagerDirectory> {
        &self.directory
    }
}
