//! Inline literal backend

use super::error::{FetchError, FetchResult};
use super::traits::{Backend, ProviderKind};
use crate::document::Document;

/// Resolves `value: <scalar>` to the scalar itself
///
/// Substitution is one-shot: the literal is never re-parsed, so text that
/// happens to look like another provider tag stays text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueBackend;

impl ValueBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for ValueBackend {
    type Session = ();

    fn kind(&self) -> ProviderKind {
        ProviderKind::Value
    }

    fn create_session(&self) -> FetchResult<()> {
        Ok(())
    }

    fn fetch(&self, config: &Document, _session: &()) -> FetchResult<Document> {
        if config.is_scalar() {
            Ok(config.clone())
        } else {
            Err(FetchError::unsupported_shape(
                self.kind().key(),
                format!("expected a scalar literal, got {}", config.kind_name()),
            ))
        }
    }
}
