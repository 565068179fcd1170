pub mod resolver;
pub mod server;

pub use resolver::{
    ErrorKind, Platform, ResolutionError, ResolutionRequest, ResolutionResult, Resolver,
    ResolverConfig, Variant,
};
