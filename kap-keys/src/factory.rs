//! Key-pair generator factory
//!
//! The factory owns the process-wide generator cache. Generators are
//! created on first use via the registry dispatch and shared behind `Arc`;
//! concurrent first-use races on the same spec resolve to a single cached
//! generator. Composite specs are assembled per call from individually
//! cached component generators and are not cached at the composite level.

use crate::error::{Error, Result};
use crate::generator::KeyPairGenerator;
use crate::registry;
use crate::spec::AlgorithmSpec;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Factory and cache for [`KeyPairGenerator`] objects
#[derive(Debug, Default)]
pub struct KeyPairFactory {
    generators: RwLock<HashMap<AlgorithmSpec, Arc<KeyPairGenerator>>>,
}

impl KeyPairFactory {
    /// Create a factory with an empty cache
    pub fn new() -> Self {
        Self {
            generators: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached generator for `spec`, creating it on first use
    pub fn generator(&self, spec: &AlgorithmSpec) -> Result<Arc<KeyPairGenerator>> {
        registry::validate(spec)?;

        if let AlgorithmSpec::Composite(parts) = spec {
            let mut components = Vec::with_capacity(parts.len());
            for part in parts {
                components.push(self.generator(part)?);
            }
            return Ok(Arc::new(KeyPairGenerator::composite(
                spec.clone(),
                components,
            )));
        }

        // Fast path: generator already cached.
        if let Ok(generators) = self.generators.read() {
            if let Some(generator) = generators.get(spec) {
                return Ok(Arc::clone(generator));
            }
        } else {
            return Err(Error::Cryptography(
                "generator cache read lock poisoned".to_string(),
            ));
        }

        // Slow path: insert under the write lock. `entry` keeps a racing
        // first use from handing out two generators for one spec.
        match self.generators.write() {
            Ok(mut generators) => {
                let generator = generators.entry(spec.clone()).or_insert_with(|| {
                    debug!(target: "kap::keys", spec = %spec.name(), "building generator");
                    Arc::new(KeyPairGenerator::new(spec.clone()))
                });
                Ok(Arc::clone(generator))
            }
            Err(_) => Err(Error::Cryptography(
                "generator cache write lock poisoned".to_string(),
            )),
        }
    }

    /// Number of generators currently cached
    pub fn cached_generators(&self) -> usize {
        self.generators.read().map(|g| g.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{EcCurve, HssParams, MlKemLevel};
    use assert_matches::assert_matches;

    #[test]
    fn test_generator_is_cached_per_spec() {
        let factory = KeyPairFactory::new();
        let first = factory.generator(&AlgorithmSpec::X25519).unwrap();
        let second = factory.generator(&AlgorithmSpec::X25519).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.cached_generators(), 1);

        factory.generator(&AlgorithmSpec::Ec(EcCurve::P256)).unwrap();
        assert_eq!(factory.cached_generators(), 2);
    }

    #[test]
    fn test_unsupported_spec_is_rejected() {
        let factory = KeyPairFactory::new();
        assert_matches!(
            factory.generator(&AlgorithmSpec::Hss(HssParams { tree_height: 0 })),
            Err(Error::InvalidKeySpec(_))
        );
        assert_eq!(factory.cached_generators(), 0);
    }

    #[test]
    fn test_composite_generators_are_not_cached() {
        let factory = KeyPairFactory::new();
        let spec = AlgorithmSpec::Composite(vec![
            AlgorithmSpec::X25519,
            AlgorithmSpec::MlKem(MlKemLevel::MlKem768),
        ]);
        let first = factory.generator(&spec).unwrap();
        let second = factory.generator(&spec).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        // Only the two component generators are cached.
        assert_eq!(factory.cached_generators(), 2);
    }

    #[test]
    fn test_concurrent_first_use_yields_one_generator() {
        let factory = Arc::new(KeyPairFactory::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let factory = Arc::clone(&factory);
            handles.push(std::thread::spawn(move || {
                factory.generator(&AlgorithmSpec::Ec(EcCurve::Secp256k1)).unwrap()
            }));
        }
        let generators: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for generator in &generators[1..] {
            assert!(Arc::ptr_eq(&generators[0], generator));
        }
        assert_eq!(factory.cached_generators(), 1);
    }

    #[test]
    fn test_composite_pair_roundtrip_through_factory() {
        let factory = KeyPairFactory::new();
        let spec = AlgorithmSpec::Composite(vec![
            AlgorithmSpec::X25519,
            AlgorithmSpec::MlKem(MlKemLevel::MlKem512),
        ]);
        let generator = factory.generator(&spec).unwrap();
        let pair = generator.generate_key_pair().unwrap();
        assert!(pair.is_valid());

        let spki = generator.spki_encoding(&pair).unwrap();
        let pkcs8 = generator.pkcs8_encoding(&pair).unwrap();
        let derived = generator.derive_key_pair(&spki, &pkcs8).unwrap();
        assert!(derived.is_valid());
        assert_eq!(derived.public().raw_bytes(), pair.public().raw_bytes());
    }
}
