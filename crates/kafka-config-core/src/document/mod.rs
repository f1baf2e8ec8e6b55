//! Document model and path-addressed tree operations
//!
//! - `Document`: generic tree of maps, sequences and scalars
//! - `Address`: location of a node from the document root
//! - `locate`: find every container holding a provider key
//! - `rewrite`: replace matched containers with fetched values

mod address;
mod locate;
mod node;
mod rewrite;

pub use address::{Address, Segment};
pub use locate::{locate, Match};
pub use node::{Document, Mapping};
pub use rewrite::{prune, rewrite, RewriteError};
