//! Resolution of provider tags
//!
//! `Resolver` owns one backend per provider kind and runs them over a
//! document in pipeline order, rewriting each matched container with the
//! value its backend fetched.

mod error;
mod pipeline;

pub use error::{ResolveError, ResolveResult};
pub use pipeline::{Resolution, Resolver, StageReport};
