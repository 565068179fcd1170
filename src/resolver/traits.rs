// Extractor trait definition

use async_trait::async_trait;

use super::errors::ExtractError;
use super::models::{AdapterKind, RawMetadata};

/// Extraction capability registered in the dispatcher's adapter table
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name of the adapter (for logging)
    fn name(&self) -> &'static str;

    /// Backend family, picks the normalizer's label rules
    fn kind(&self) -> AdapterKind;

    /// Fetch metadata plus filtered, ordered format descriptors
    async fn extract(&self, url: &str) -> Result<RawMetadata, ExtractError>;
}
