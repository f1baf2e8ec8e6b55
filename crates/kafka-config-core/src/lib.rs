//! Kafka Config Core
//!
//! Resolution engine for declarative Kafka client configuration. Leaf values
//! in a document may be provider tags naming where the real value lives:
//!
//! ```yaml
//! sasl:
//!   username:
//!     value: kafka-client
//!   password:
//!     kubernetes:
//!       secret: { name: kafka, namespace: prod, key: "credentials:PASSWORD" }
//!   token:
//!     google_secret_manager:
//!       secret: projects/my-project/secrets/kafka-token
//! ssl:
//!   ca:
//!     file: { path: certs/ca.pem }
//! ```
//!
//! A [`Resolver`] locates every tag, fetches each value through its backend
//! and rewrites the document so only concrete values remain.
//!
//! ```rust,no_run
//! use kafka_config_core::{load_document, Resolver, ResolverSettings};
//!
//! let settings = ResolverSettings::from_env();
//! let document = load_document("client.yaml")?;
//! let resolved = Resolver::new(&settings).resolve(document)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backends;
pub mod config;
pub mod document;
pub mod logging;
pub mod properties;
pub mod resolver;

// Re-export commonly used types
pub use backends::{Backend, FetchError, FetchResult, ProviderKind};

pub use config::{load_document, ConfigError, ConfigResult, ResolverSettings};

pub use document::{locate, rewrite, Address, Document, Match, Segment};

pub use logging::{Logger, MemoryLogger, NoOpLogger, SharedLogger};

pub use resolver::{Resolution, ResolveError, ResolveResult, Resolver, StageReport};
