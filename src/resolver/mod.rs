// Resolution engine: platform dispatch, extraction, normalization, dedup

pub mod config;
pub mod dedupe;
pub mod dispatcher;
pub mod errors;
pub mod extractors;
pub mod models;
pub mod normalizer;
pub mod traits;
pub mod utils;

pub use config::ResolverConfig;
pub use dispatcher::Resolver;
pub use errors::{ErrorKind, ExtractError, ResolutionError};
pub use models::{Platform, ResolutionRequest, ResolutionResult, Variant};
pub use traits::Extractor;
