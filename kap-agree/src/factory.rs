//! Agreement session factory
//!
//! The factory validates agreement specs and hands out fresh single-use
//! [`Agreement`] sessions. It shares one [`KeyPairFactory`] across all
//! sessions so ephemeral generation reuses the cached per-spec generators.

use crate::agreement::Agreement;
use crate::error::Result;
use crate::spec::AgreementSpec;
use kap_keys::KeyPairFactory;
use std::sync::Arc;
use tracing::debug;

/// Factory for agreement sessions
#[derive(Debug)]
pub struct AgreementFactory {
    keys: Arc<KeyPairFactory>,
}

impl AgreementFactory {
    /// Create a factory with its own key-pair factory
    pub fn new() -> Self {
        Self {
            keys: Arc::new(KeyPairFactory::new()),
        }
    }

    /// Create a factory sharing an existing key-pair factory
    pub fn with_key_factory(keys: Arc<KeyPairFactory>) -> Self {
        Self { keys }
    }

    /// The shared key-pair factory
    pub fn key_factory(&self) -> Arc<KeyPairFactory> {
        Arc::clone(&self.keys)
    }

    /// Create a fresh session for a validated spec
    ///
    /// Sessions are single-use: one handshake attempt each, with a new
    /// session per retry.
    pub fn agreement(&self, spec: AgreementSpec) -> Result<Agreement> {
        spec.validate()?;
        debug!(
            target: "kap::agree",
            variant = %spec.variant.as_str(),
            spec = %spec.key_spec.name(),
            "creating agreement session"
        );
        Ok(Agreement::new(spec, Arc::clone(&self.keys)))
    }
}

impl Default for AgreementFactory {
    fn default() -> Self {
        Self::new()
    }
}
