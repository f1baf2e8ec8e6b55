//! Resolution error types

use thiserror::Error;

use crate::backends::{FetchError, ProviderKind};
use crate::document::{Address, RewriteError};

/// Errors that abort a resolution pass
///
/// Every variant tied to a tag names its provider, and through it the backend,
/// so the failing tag can be found in the input document.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A provider tag that is not the sole content of its container
    #[error(
        "{provider} tag at {address} must be the only key in its mapping (found also: {})",
        .siblings.join(", ")
    )]
    SiblingKeys {
        provider: ProviderKind,
        address: Address,
        siblings: Vec<String>,
    },

    #[error("{} backend could not start a session: {source}", .provider.backend_name())]
    Session {
        provider: ProviderKind,
        #[source]
        source: FetchError,
    },

    #[error("{} backend failed to resolve {provider} tag at {address}: {source}", .provider.backend_name())]
    Fetch {
        provider: ProviderKind,
        address: Address,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

impl ResolveError {
    /// Provider whose stage failed
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            Self::SiblingKeys { provider, .. }
            | Self::Session { provider, .. }
            | Self::Fetch { provider, .. } => Some(*provider),
            Self::Rewrite(_) => None,
        }
    }

    /// Address of the offending container, when there is one
    pub fn address(&self) -> Option<&Address> {
        match self {
            Self::SiblingKeys { address, .. } | Self::Fetch { address, .. } => Some(address),
            Self::Rewrite(RewriteError::MissingAddress(address)) => Some(address),
            Self::Session { .. } => None,
        }
    }

    /// Underlying backend failure
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::Session { source, .. } | Self::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
