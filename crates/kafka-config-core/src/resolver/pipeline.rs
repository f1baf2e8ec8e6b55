//! The resolution pipeline
//!
//! Backends run once each, in the fixed order
//! Value → Kubernetes → Google Secret Manager → File, every stage working on
//! the document produced by the one before. A stage with no matching tags is
//! skipped without opening a session.

use crate::backends::{
    Backend, FileBackend, KubernetesBackend, ProviderKind, SecretManagerBackend, ValueBackend,
};
use crate::config::ResolverSettings;
use crate::document::{locate, rewrite, Document};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::{log_debug, log_info};

use super::error::{ResolveError, ResolveResult};

use std::sync::Arc;

/// How many tags one stage replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub provider: ProviderKind,
    pub resolved: usize,
}

impl StageReport {
    /// Whether the stage found nothing to do
    pub fn skipped(&self) -> bool {
        self.resolved == 0
    }
}

/// Output of a successful pass
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub document: Document,
    /// One entry per backend, in pipeline order
    pub stages: Vec<StageReport>,
}

impl Resolution {
    pub fn total_resolved(&self) -> usize {
        self.stages.iter().map(|s| s.resolved).sum()
    }
}

/// Resolves every provider tag in a document
///
/// # Example
///
/// ```
/// use kafka_config_core::{Document, Resolver, ResolverSettings};
///
/// let document = Document::from_yaml_str("port: {value: 9092}").unwrap();
/// let resolved = Resolver::new(&ResolverSettings::default())
///     .resolve(document)
///     .unwrap();
/// assert_eq!(resolved, Document::from_yaml_str("port: 9092").unwrap());
/// ```
pub struct Resolver {
    value: ValueBackend,
    kubernetes: KubernetesBackend,
    secret_manager: SecretManagerBackend,
    file: FileBackend,
    logger: SharedLogger,
}

impl Resolver {
    /// Build every backend from `settings`
    ///
    /// Nothing is contacted until a pass needs it.
    pub fn new(settings: &ResolverSettings) -> Self {
        Self {
            value: ValueBackend::new(),
            kubernetes: KubernetesBackend::from_settings(&settings.kubernetes),
            secret_manager: SecretManagerBackend::from_settings(&settings.secret_manager),
            file: FileBackend::from_settings(&settings.file),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_kubernetes(mut self, backend: KubernetesBackend) -> Self {
        self.kubernetes = backend;
        self
    }

    pub fn with_secret_manager(mut self, backend: SecretManagerBackend) -> Self {
        self.secret_manager = backend;
        self
    }

    pub fn with_file(mut self, backend: FileBackend) -> Self {
        self.file = backend;
        self
    }

    /// Run one full pass and return the resolved document
    ///
    /// On error nothing is returned; the input has been consumed and no
    /// partially resolved document escapes.
    pub fn resolve(&self, document: Document) -> ResolveResult<Document> {
        self.resolve_with_report(document).map(|r| r.document)
    }

    /// Like [`resolve`](Self::resolve), also reporting per-stage counts
    pub fn resolve_with_report(&self, document: Document) -> ResolveResult<Resolution> {
        let mut stages = Vec::with_capacity(ProviderKind::PIPELINE_ORDER.len());

        let document = self.run_stage(&self.value, document, &mut stages)?;
        let document = self.run_stage(&self.kubernetes, document, &mut stages)?;
        let document = self.run_stage(&self.secret_manager, document, &mut stages)?;
        let document = self.run_stage(&self.file, document, &mut stages)?;

        let resolution = Resolution { document, stages };
        log_info!(
            self.logger,
            "Resolved {} provider tag(s)",
            resolution.total_resolved()
        );
        Ok(resolution)
    }

    fn run_stage<B: Backend>(
        &self,
        backend: &B,
        document: Document,
        stages: &mut Vec<StageReport>,
    ) -> ResolveResult<Document> {
        let provider = backend.kind();
        let key = provider.key();
        let matches = locate(&document, key);

        if matches.is_empty() {
            log_debug!(self.logger, "No {} tags, skipping {} backend", key, provider.backend_name());
            stages.push(StageReport { provider, resolved: 0 });
            return Ok(document);
        }

        if let Some(shared) = matches.iter().find(|m| !m.is_exclusive()) {
            return Err(ResolveError::SiblingKeys {
                provider,
                address: shared.address.clone(),
                siblings: shared.siblings.clone(),
            });
        }

        log_info!(
            self.logger,
            "Resolving {} {} tag(s) with the {} backend",
            matches.len(),
            key,
            provider.backend_name()
        );
        let session = backend
            .create_session()
            .map_err(|source| ResolveError::Session { provider, source })?;

        let mut resolved = Vec::with_capacity(matches.len());
        for found in matches {
            let value = backend.fetch(&found.config, &session).map_err(|source| {
                ResolveError::Fetch {
                    provider,
                    address: found.address.clone(),
                    source,
                }
            })?;
            log_debug!(self.logger, "Resolved {} at {}", key, found.address);
            resolved.push((found.address, value));
        }

        stages.push(StageReport {
            provider,
            resolved: resolved.len(),
        });
        Ok(rewrite(document, key, resolved)?)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("kubernetes", &self.kubernetes)
            .field("secret_manager", &self.secret_manager)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FetchError, MockCluster, MockSecretManager};
    use crate::document::{Address, Segment};
    use crate::logging::{LogLevel, MemoryLogger};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn doc(yaml: &str) -> Document {
        Document::from_yaml_str(yaml).unwrap()
    }

    fn resolver(cluster: &MockCluster, manager: &MockSecretManager, base_dir: &Path) -> Resolver {
        Resolver::new(&ResolverSettings::default())
            .with_kubernetes(KubernetesBackend::new(Arc::new(cluster.clone())))
            .with_secret_manager(SecretManagerBackend::new(Arc::new(manager.clone())))
            .with_file(FileBackend::with_base_dir(base_dir))
    }

    fn has_provider_key(document: &Document) -> bool {
        ProviderKind::PIPELINE_ORDER
            .iter()
            .any(|kind| !locate(document, kind.key()).is_empty())
    }

    #[test]
    fn test_document_without_tags_is_unchanged() {
        let dir = tempdir().unwrap();
        let cluster = MockCluster::new();
        let manager = MockSecretManager::new();
        let input = doc("a: {b: [1, two, {c: null}]}\nd: true\n");

        let output = resolver(&cluster, &manager, dir.path())
            .resolve(input.clone())
            .unwrap();

        assert_eq!(output, input);
        assert_eq!(cluster.connections(), 0);
        assert_eq!(manager.connections(), 0);
    }

    #[test]
    fn test_nested_file_tag() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("p.txt"), "X").unwrap();

        let output = resolver(&MockCluster::new(), &MockSecretManager::new(), dir.path())
            .resolve(doc(r#"{a: {b: [{c: {file: {path: "p.txt"}}}]}}"#))
            .unwrap();

        assert_eq!(output, doc("{a: {b: [{c: X}]}}"));
    }

    #[test]
    fn test_all_providers_resolved() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ca.pem"), "-----BEGIN CERTIFICATE-----\n").unwrap();
        let cluster = MockCluster::new()
            .with_secret("prod", "kafka", "creds", b"USER=alice\n# rotated\nPASS=x\n")
            .with_config_map_entry("prod", "certs", "client.pem", "CLIENT");
        let manager = MockSecretManager::new()
            .with_version("projects/p/secrets/kafka-pass/versions/latest", b"s3cret");

        let input = doc(
            r#"
bootstrap:
  servers: {value: "broker:9092"}
sasl:
  username: {kubernetes: {secret: {name: kafka, namespace: prod, key: "creds:USER"}}}
  password: {google_secret_manager: {secret: projects/p/secrets/kafka-pass}}
ssl:
  - ca: {file: {path: ca.pem}}
  - cert: {kubernetes: {configmap: {name: certs, namespace: prod, key: client.pem}}}
"#,
        );

        let resolution = resolver(&cluster, &manager, dir.path())
            .resolve_with_report(input)
            .unwrap();
        let output = &resolution.document;

        assert!(!has_provider_key(output));
        let at = |path: &[&str]| -> Address { path.iter().map(|key| Segment::from(*key)).collect() };
        assert_eq!(output.get(&at(&["bootstrap", "servers"])), Some(&Document::from("broker:9092")));
        assert_eq!(output.get(&at(&["sasl", "username"])), Some(&Document::from("alice")));
        assert_eq!(
            output.get(&at(&["sasl", "password"])),
            Some(&Document::Bytes(b"s3cret".to_vec()))
        );
        let cert = Address::root().child("ssl").child(1usize).child("cert");
        assert_eq!(output.get(&cert), Some(&Document::from("CLIENT")));
        let ca = Address::root().child("ssl").child(0usize).child("ca");
        assert_eq!(output.get(&ca).and_then(Document::as_str), Some("-----BEGIN CERTIFICATE-----\n"));

        assert_eq!(cluster.connections(), 1);
        assert_eq!(manager.connections(), 1);
        let counts: Vec<_> = resolution.stages.iter().map(|s| (s.provider, s.resolved)).collect();
        assert_eq!(
            counts,
            vec![
                (ProviderKind::Value, 1),
                (ProviderKind::Kubernetes, 2),
                (ProviderKind::GoogleSecretManager, 1),
                (ProviderKind::File, 1),
            ]
        );
        assert_eq!(resolution.total_resolved(), 5);
    }

    #[test]
    fn test_value_literal_is_not_rescanned() {
        let dir = tempdir().unwrap();
        let output = resolver(&MockCluster::new(), &MockSecretManager::new(), dir.path())
            .resolve(doc(r#"x: {value: "{file: {path: missing.txt}}"}"#))
            .unwrap();
        assert_eq!(output, doc(r#"x: "{file: {path: missing.txt}}""#));
    }

    #[test]
    fn test_untouched_backends_open_no_session() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "A").unwrap();
        let cluster = MockCluster::new();
        let manager = MockSecretManager::new();

        let resolution = resolver(&cluster, &manager, dir.path())
            .resolve_with_report(doc("a: {file: {path: a.txt}}\nb: {value: 1}\n"))
            .unwrap();

        assert_eq!(cluster.connections(), 0);
        assert_eq!(manager.connections(), 0);
        assert!(resolution.stages[1].skipped());
        assert!(resolution.stages[2].skipped());
    }

    #[test]
    fn test_one_session_per_stage() {
        let dir = tempdir().unwrap();
        let cluster = MockCluster::new()
            .with_secret("ns", "s", "a", b"1")
            .with_secret("ns", "s", "b", b"2");

        resolver(&cluster, &MockSecretManager::new(), dir.path())
            .resolve(doc(
                "a: {kubernetes: {secret: {name: s, namespace: ns, key: a}}}\n\
                 b: [{kubernetes: {secret: {name: s, namespace: ns, key: b}}}]\n",
            ))
            .unwrap();

        assert_eq!(cluster.connections(), 1);
    }

    #[test]
    fn test_missing_file_aborts_pass() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("present.txt"), "ok").unwrap();

        let err = resolver(&MockCluster::new(), &MockSecretManager::new(), dir.path())
            .resolve(doc(
                "first: {file: {path: missing.txt}}\nsecond: {file: {path: present.txt}}\n",
            ))
            .unwrap_err();

        assert_eq!(err.provider(), Some(ProviderKind::File));
        assert_eq!(err.address(), Some(&Address::root().child("first")));
        assert!(matches!(err.fetch_error(), Some(FetchError::Io { .. })));
    }

    #[test]
    fn test_failed_stage_stops_later_stages() {
        let dir = tempdir().unwrap();
        let manager = MockSecretManager::new().with_version("projects/p/secrets/s/versions/latest", b"x");

        let err = resolver(&MockCluster::new(), &manager, dir.path())
            .resolve(doc(
                "a: {kubernetes: {secret: {name: gone, namespace: ns, key: k}}}\n\
                 b: {google_secret_manager: {secret: projects/p/secrets/s}}\n",
            ))
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::Fetch { provider: ProviderKind::Kubernetes, source: FetchError::NotFound(_), .. }
        ));
        assert_eq!(manager.connections(), 0);
    }

    #[test]
    fn test_failed_fetch_stops_remaining_tags_in_stage() {
        let dir = tempdir().unwrap();
        let manager = MockSecretManager::new().with_version("projects/p/secrets/b/versions/latest", b"x");

        let err = resolver(&MockCluster::new(), &manager, dir.path())
            .resolve(doc(
                "a: {google_secret_manager: {secret: projects/p/secrets/a}}\n\
                 b: {google_secret_manager: {secret: projects/p/secrets/b}}\n",
            ))
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::Fetch {
                provider: ProviderKind::GoogleSecretManager,
                source: FetchError::NotFound(_),
                ..
            }
        ));
        assert_eq!(err.address(), Some(&Address::root().child("a")));
        assert_eq!(manager.connections(), 1);
        assert_eq!(manager.accesses(), 1);
    }

    #[test]
    fn test_composite_field_missing() {
        let dir = tempdir().unwrap();
        let cluster = MockCluster::new().with_secret("ns", "s", "secret", b"FOO=1\n#comment\nBAR=2\n");

        let err = resolver(&cluster, &MockSecretManager::new(), dir.path())
            .resolve(doc("x: {kubernetes: {secret: {name: s, namespace: ns, key: \"secret:BAZ\"}}}"))
            .unwrap_err();

        assert!(matches!(err.fetch_error(), Some(FetchError::FieldNotFound { .. })));
    }

    #[test]
    fn test_sibling_keys_rejected_before_session() {
        let dir = tempdir().unwrap();
        let cluster = MockCluster::new().with_secret("ns", "s", "k", b"v");

        let err = resolver(&cluster, &MockSecretManager::new(), dir.path())
            .resolve(doc(
                "x:\n  kubernetes: {secret: {name: s, namespace: ns, key: k}}\n  comment: keep me\n",
            ))
            .unwrap_err();

        match err {
            ResolveError::SiblingKeys { provider, address, siblings } => {
                assert_eq!(provider, ProviderKind::Kubernetes);
                assert_eq!(address, Address::root().child("x"));
                assert_eq!(siblings, vec!["comment".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(cluster.connections(), 0);
    }

    #[test]
    fn test_unreachable_cluster() {
        let dir = tempdir().unwrap();
        let err = resolver(&MockCluster::unreachable("connection refused"), &MockSecretManager::new(), dir.path())
            .resolve(doc("x: {kubernetes: {secret: {name: s, namespace: ns, key: k}}}"))
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::Session { provider: ProviderKind::Kubernetes, source: FetchError::Connection(_) }
        ));
    }

    #[test]
    fn test_progress_is_logged() {
        let dir = tempdir().unwrap();
        let logger = MemoryLogger::new();

        resolver(&MockCluster::new(), &MockSecretManager::new(), dir.path())
            .with_logger(Arc::new(logger.clone()))
            .resolve(doc("a: {value: 1}"))
            .unwrap();

        assert!(logger
            .messages(LogLevel::Info)
            .iter()
            .any(|m| m.contains("Value backend")));
        assert!(logger.contains("skipping Kubernetes backend"));
        assert!(logger.contains("Resolved 1 provider tag(s)"));
    }
}
