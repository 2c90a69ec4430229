use cache_system::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to {operation} {resource}: {error:#}")]
    Mutation {
        resource: &'static str,
        operation: &'static str,
        error: anyhow::Error,
    },
}

impl HookError {
    pub fn mutation(resource: &'static str, operation: &'static str, error: anyhow::Error) -> Self {
        HookError::Mutation {
            resource,
            operation,
            error,
        }
    }
}
