//! Project lookup used to resolve a caller's platform

#[cfg(test)]
use mockall::automock;

use crate::piece::error::RegistryError;
use crate::piece::types::Project;

/// Trait for looking up projects by id
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ProjectLookup: Send + Sync {
    /// Returns the project, or `None` if the id is unknown
    ///
    /// Unknown ids are not an error: anonymous callers may carry random ids.
    async fn get_one(&self, project_id: &str) -> Result<Option<Project>, RegistryError>;
}
