use async_trait::async_trait;

use crate::types::{ProviderError, ResourceSnapshot};

pub mod aws;

/// Outcome of a single fetch. A missing resource is a normal outcome and is
/// reported per-check; only transport or auth level failures surface as
/// `ProviderError`.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(ResourceSnapshot),
    NotFound,
}

#[async_trait]
pub trait ResourceProvider {
    /// Whether `resource_id` is shaped like an identifier this provider can
    /// fetch. Checked before any network call is made.
    fn valid_id(&self, resource_id: &str) -> bool {
        !resource_id.is_empty()
    }

    async fn fetch(&self, resource_id: &str) -> Result<FetchOutcome, ProviderError>;
}
