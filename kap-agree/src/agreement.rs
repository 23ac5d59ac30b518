//! Agreement protocol engine
//!
//! An [`Agreement`] is a transient, single-use handshake session. It drives
//! one of the six variants over a shared state-machine shape, consuming and
//! producing [`AgreementMessage`]s and finally yielding a derived shared
//! secret. Sessions are not safe for concurrent use; callers serialize
//! access. A failed step surfaces a typed error and leaves the session
//! state, including any partially derived secret, untouched.

use crate::error::{Error, Result};
use crate::kdf;
use crate::message::{AgreementMessage, MessageKind};
use crate::spec::{AgreementSpec, AgreementVariant};
use hmac::{Hmac, Mac};
use kap_keys::primitives::{ec, mlkem, x25519};
use kap_keys::{
    AlgorithmSpec, KeyPair, KeyPairFactory, PrivateKey, PrivateKeyMaterial, PublicKey,
    PublicKeyMaterial,
};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

const CONFIRM_LABEL: &[u8] = b"KAP-v1-confirm";
const KDF_LABEL: &[u8] = b"KAP-v1";

/// Which side of the handshake this session plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The party that sends ClientHello
    Initiator,
    /// The party that accepts ClientHello
    Responder,
}

/// Handshake session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No handshake step has run
    Init,
    /// Initiator sent ClientHello and waits for ServerHello
    HelloSent,
    /// The shared secret is derived and readable
    SecretDerived,
    /// The confirmation exchange completed
    Confirmed,
    /// The session was destroyed; no further use is possible
    Destroyed,
}

/// A single-use key-agreement session
#[derive(Debug)]
pub struct Agreement {
    spec: AgreementSpec,
    keys: Arc<KeyPairFactory>,
    state: SessionState,
    role: Option<Role>,
    own_static: Option<Arc<KeyPair>>,
    signing: Option<Arc<KeyPair>>,
    peer_verification: Option<PublicKey>,
    peer_static: Option<PublicKey>,
    ephemeral: Option<KeyPair>,
    client_hello: Option<Vec<u8>>,
    server_hello: Option<Vec<u8>>,
    secret: Option<Zeroizing<Vec<u8>>>,
}

impl Agreement {
    pub(crate) fn new(spec: AgreementSpec, keys: Arc<KeyPairFactory>) -> Self {
        Self {
            spec,
            keys,
            state: SessionState::Init,
            role: None,
            own_static: None,
            signing: None,
            peer_verification: None,
            peer_static: None,
            ephemeral: None,
            client_hello: None,
            server_hello: None,
            secret: None,
        }
    }

    /// The agreement spec this session runs
    pub fn spec(&self) -> &AgreementSpec {
        &self.spec
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The role this session plays, once the first step has run
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Configure the responder's signing key pair (signed variant only)
    ///
    /// Must be called before the handshake starts. The key must belong to a
    /// stateless signing family.
    pub fn set_signing_key_pair(&mut self, pair: Arc<KeyPair>) -> Result<()> {
        self.check_state(SessionState::Init)?;
        if self.spec.variant != AgreementVariant::Signed {
            return Err(Error::ProtocolState(format!(
                "the {} variant takes no signing key pair",
                self.spec.variant.as_str()
            )));
        }
        let private = pair
            .private()
            .ok_or_else(|| Error::KeyPairMismatch("signing key pair has no private key".to_string()))?;
        match private.material() {
            PrivateKeyMaterial::Ed25519(_)
            | PrivateKeyMaterial::P256(_)
            | PrivateKeyMaterial::Secp256k1(_) => {}
            _ => {
                return Err(Error::KeyPairMismatch(format!(
                    "{} keys cannot sign handshake transcripts",
                    pair.spec().name()
                )))
            }
        }
        self.signing = Some(pair);
        Ok(())
    }

    /// Configure the peer's verification key (signed variant, initiator)
    ///
    /// Must be called before the handshake starts.
    pub fn set_peer_verification_key(&mut self, key: PublicKey) -> Result<()> {
        self.check_state(SessionState::Init)?;
        if self.spec.variant != AgreementVariant::Signed {
            return Err(Error::ProtocolState(format!(
                "the {} variant takes no verification key",
                self.spec.variant.as_str()
            )));
        }
        match key.material() {
            PublicKeyMaterial::Ed25519(_)
            | PublicKeyMaterial::P256(_)
            | PublicKeyMaterial::Secp256k1(_) => {}
            _ => {
                return Err(Error::KeyPairMismatch(format!(
                    "{} keys cannot verify handshake transcripts",
                    key.spec().name()
                )))
            }
        }
        self.peer_verification = Some(key);
        Ok(())
    }

    /// Open the handshake as initiator
    ///
    /// `own_static` is required for the static variants (Basic, Signed,
    /// Unified, MQV) and must be absent for the one-shot variants; `peer`
    /// is the responder's static public key.
    pub fn create_client_hello(
        &mut self,
        own_static: Option<Arc<KeyPair>>,
        peer: &PublicKey,
    ) -> Result<AgreementMessage> {
        self.check_state(SessionState::Init)?;
        self.check_key_spec(peer.spec())?;
        debug!(
            target: "kap::agree",
            variant = %self.spec.variant.as_str(),
            spec = %self.spec.key_spec.name(),
            "creating ClientHello"
        );

        match self.spec.variant {
            AgreementVariant::Anonymous | AgreementVariant::Kem => {
                if own_static.is_some() {
                    return Err(Error::KeyPairMismatch(format!(
                        "the {} variant takes no initiator static key",
                        self.spec.variant.as_str()
                    )));
                }
                let (message, raw) = self.one_shot_hello(peer)?;
                let secret = self.derive_secret(&raw)?;

                let encoded = message.encode();
                self.role = Some(Role::Initiator);
                self.client_hello = Some(encoded);
                self.secret = Some(secret);
                self.state = SessionState::SecretDerived;
                Ok(message)
            }
            AgreementVariant::Basic | AgreementVariant::Signed => {
                let own = require_static(own_static, self.spec.variant)?;
                self.check_key_spec(own.spec())?;
                require_private(&own)?;

                let message =
                    AgreementMessage::new(MessageKind::ClientHello, self.spec.key_spec.clone());
                let encoded = message.encode();
                self.role = Some(Role::Initiator);
                self.own_static = Some(own);
                self.peer_static = Some(peer.clone());
                self.client_hello = Some(encoded);
                self.state = SessionState::HelloSent;
                Ok(message)
            }
            AgreementVariant::Unified | AgreementVariant::Mqv => {
                let own = require_static(own_static, self.spec.variant)?;
                self.check_key_spec(own.spec())?;
                require_private(&own)?;
                let ephemeral = self.generate_ephemeral(&self.spec.key_spec)?;

                let message =
                    AgreementMessage::new(MessageKind::ClientHello, self.spec.key_spec.clone())
                        .with_ephemeral_public(ephemeral.public().raw_bytes());
                let encoded = message.encode();
                self.role = Some(Role::Initiator);
                self.own_static = Some(own);
                self.peer_static = Some(peer.clone());
                self.ephemeral = Some(ephemeral);
                self.client_hello = Some(encoded);
                self.state = SessionState::HelloSent;
                Ok(message)
            }
        }
    }

    /// Process a ClientHello as responder
    ///
    /// Returns the ServerHello to send back, or `None` for the one-shot
    /// variants. `peer_static` is the initiator's static public key and is
    /// required for the static variants.
    pub fn accept_client_hello(
        &mut self,
        own_static: Arc<KeyPair>,
        peer_static: Option<&PublicKey>,
        message: &AgreementMessage,
    ) -> Result<Option<AgreementMessage>> {
        self.check_state(SessionState::Init)?;
        self.check_message(message, MessageKind::ClientHello)?;
        self.check_key_spec(own_static.spec())?;
        let own_private = require_private(&own_static)?;
        debug!(
            target: "kap::agree",
            variant = %self.spec.variant.as_str(),
            "accepting ClientHello"
        );

        let encoded_hello = message.encode();
        match self.spec.variant {
            AgreementVariant::Anonymous | AgreementVariant::Kem => {
                let raw = self.one_shot_accept(own_private, message)?;
                let secret = self.derive_secret(&raw)?;

                self.role = Some(Role::Responder);
                self.client_hello = Some(encoded_hello);
                self.secret = Some(secret);
                self.state = SessionState::SecretDerived;
                Ok(None)
            }
            AgreementVariant::Basic | AgreementVariant::Signed => {
                let peer = peer_static.ok_or_else(|| {
                    Error::ProtocolState(
                        "the static variants require the initiator's public key".to_string(),
                    )
                })?;
                self.check_key_spec(peer.spec())?;

                let raw = agree_keys(own_private, peer)?;
                let secret = self.derive_secret(&raw)?;

                let mut server =
                    AgreementMessage::new(MessageKind::ServerHello, self.spec.key_spec.clone());
                if self.spec.variant == AgreementVariant::Signed {
                    let signing = self.signing.as_ref().ok_or_else(|| {
                        Error::ProtocolState("signing key pair not configured".to_string())
                    })?;
                    let mut transcript = encoded_hello.clone();
                    transcript.extend_from_slice(&server.encode_unsigned());
                    let signature = sign_transcript(signing, &transcript)?;
                    server = server.with_signature(signature);
                }

                let encoded_server = server.encode();
                self.role = Some(Role::Responder);
                self.peer_static = Some(peer.clone());
                self.client_hello = Some(encoded_hello);
                self.server_hello = Some(encoded_server);
                self.secret = Some(secret);
                self.state = SessionState::SecretDerived;
                Ok(Some(server))
            }
            AgreementVariant::Unified | AgreementVariant::Mqv => {
                let peer = peer_static.ok_or_else(|| {
                    Error::ProtocolState(
                        "the static variants require the initiator's public key".to_string(),
                    )
                })?;
                self.check_key_spec(peer.spec())?;
                let peer_ephemeral = decode_ephemeral(&self.spec.key_spec, message)?;
                let ephemeral = self.generate_ephemeral(&self.spec.key_spec)?;

                let raw = combine(
                    self.spec.variant,
                    &own_static,
                    &ephemeral,
                    peer,
                    &peer_ephemeral,
                )?;
                let secret = self.derive_secret(&raw)?;

                let server =
                    AgreementMessage::new(MessageKind::ServerHello, self.spec.key_spec.clone())
                        .with_ephemeral_public(ephemeral.public().raw_bytes());
                let encoded_server = server.encode();

                // The responder's ephemeral private key has served its
                // purpose; dropping it here preserves forward secrecy.
                self.role = Some(Role::Responder);
                self.peer_static = Some(peer.clone());
                self.client_hello = Some(encoded_hello);
                self.server_hello = Some(encoded_server);
                self.secret = Some(secret);
                self.state = SessionState::SecretDerived;
                Ok(Some(server))
            }
        }
    }

    /// Process the ServerHello as initiator
    ///
    /// Returns the ClientConfirm to send back when the spec requests
    /// confirmation.
    pub fn accept_server_hello(
        &mut self,
        message: &AgreementMessage,
    ) -> Result<Option<AgreementMessage>> {
        self.check_state(SessionState::HelloSent)?;
        if self.role != Some(Role::Initiator) {
            return Err(Error::ProtocolState(
                "only the initiator accepts a ServerHello".to_string(),
            ));
        }
        self.check_message(message, MessageKind::ServerHello)?;
        debug!(
            target: "kap::agree",
            variant = %self.spec.variant.as_str(),
            "accepting ServerHello"
        );

        let client_hello = self
            .client_hello
            .as_ref()
            .ok_or_else(|| Error::ProtocolState("no ClientHello on record".to_string()))?;
        let own = self
            .own_static
            .as_ref()
            .ok_or_else(|| Error::ProtocolState("no static key pair on record".to_string()))?;
        let peer = self
            .peer_static
            .as_ref()
            .ok_or_else(|| Error::ProtocolState("no peer public key on record".to_string()))?;

        let raw = match self.spec.variant {
            AgreementVariant::Basic => agree_keys(require_private(own)?, peer)?,
            AgreementVariant::Signed => {
                let verification = self.peer_verification.as_ref().ok_or_else(|| {
                    Error::ProtocolState("peer verification key not configured".to_string())
                })?;
                let signature = message.signature().ok_or_else(|| {
                    Error::MessageFormat("signed ServerHello carries no signature".to_string())
                })?;
                let mut transcript = client_hello.clone();
                transcript.extend_from_slice(&message.encode_unsigned());
                verification
                    .verify(&transcript, signature)
                    .map_err(|_| Error::AuthenticationFailure)?;
                agree_keys(require_private(own)?, peer)?
            }
            AgreementVariant::Unified | AgreementVariant::Mqv => {
                let peer_ephemeral = decode_ephemeral(&self.spec.key_spec, message)?;
                let ephemeral = self
                    .ephemeral
                    .as_ref()
                    .ok_or_else(|| Error::ProtocolState("no ephemeral key on record".to_string()))?;
                combine(self.spec.variant, own, ephemeral, peer, &peer_ephemeral)?
            }
            AgreementVariant::Anonymous | AgreementVariant::Kem => {
                return Err(Error::ProtocolState(format!(
                    "the {} variant has no ServerHello",
                    self.spec.variant.as_str()
                )))
            }
        };
        let secret = self.derive_secret(&raw)?;
        let encoded_server = message.encode();

        let confirm = if self.spec.confirmation {
            let mut transcript = client_hello.clone();
            transcript.extend_from_slice(&encoded_server);
            let tag = confirmation_tag(&secret, &transcript);
            Some(
                AgreementMessage::new(MessageKind::ClientConfirm, self.spec.key_spec.clone())
                    .with_confirmation_tag(tag),
            )
        } else {
            None
        };

        self.server_hello = Some(encoded_server);
        self.secret = Some(secret);
        self.ephemeral = None;
        self.state = if confirm.is_some() {
            SessionState::Confirmed
        } else {
            SessionState::SecretDerived
        };
        Ok(confirm)
    }

    /// Verify the initiator's ClientConfirm as responder
    pub fn accept_client_confirm(&mut self, message: &AgreementMessage) -> Result<()> {
        self.check_state(SessionState::SecretDerived)?;
        if self.role != Some(Role::Responder) {
            return Err(Error::ProtocolState(
                "only the responder accepts a ClientConfirm".to_string(),
            ));
        }
        if !self.spec.confirmation {
            return Err(Error::ProtocolState(
                "this agreement has no confirmation exchange".to_string(),
            ));
        }
        self.check_message(message, MessageKind::ClientConfirm)?;

        let tag = message.confirmation_tag().ok_or_else(|| {
            Error::MessageFormat("ClientConfirm carries no confirmation tag".to_string())
        })?;
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| Error::ProtocolState("no derived secret on record".to_string()))?;
        let mut transcript = self
            .client_hello
            .clone()
            .ok_or_else(|| Error::ProtocolState("no ClientHello on record".to_string()))?;
        transcript.extend_from_slice(
            self.server_hello
                .as_ref()
                .ok_or_else(|| Error::ProtocolState("no ServerHello on record".to_string()))?,
        );

        let expected = confirmation_tag(secret, &transcript);
        if !bool::from(expected.ct_eq(tag)) {
            return Err(Error::ConfirmationMismatch);
        }
        self.state = SessionState::Confirmed;
        Ok(())
    }

    /// The derived shared secret
    ///
    /// Readable once the session reaches `SecretDerived`.
    pub fn shared_secret(&self) -> Result<&[u8]> {
        match self.state {
            SessionState::SecretDerived | SessionState::Confirmed => self
                .secret
                .as_ref()
                .map(|s| s.as_slice())
                .ok_or_else(|| Error::ProtocolState("no derived secret on record".to_string())),
            _ => Err(Error::ProtocolState(
                "the shared secret has not been derived".to_string(),
            )),
        }
    }

    /// Erase all secret material and retire the session
    pub fn destroy(&mut self) {
        self.secret = None;
        self.ephemeral = None;
        self.own_static = None;
        self.signing = None;
        self.state = SessionState::Destroyed;
    }

    // --- internal helpers ---

    fn check_state(&self, expected: SessionState) -> Result<()> {
        if self.state != expected {
            return Err(Error::ProtocolState(format!(
                "step requires state {:?}, session is in {:?}",
                expected, self.state
            )));
        }
        Ok(())
    }

    fn check_key_spec(&self, spec: &AlgorithmSpec) -> Result<()> {
        if spec != &self.spec.key_spec {
            return Err(Error::KeyPairMismatch(format!(
                "key belongs to {}, agreement expects {}",
                spec.name(),
                self.spec.key_spec.name()
            )));
        }
        Ok(())
    }

    fn check_message(&self, message: &AgreementMessage, kind: MessageKind) -> Result<()> {
        if message.kind() != kind {
            return Err(Error::ProtocolState(format!(
                "expected {:?}, received {:?}",
                kind,
                message.kind()
            )));
        }
        if message.algorithm() != &self.spec.key_spec {
            return Err(Error::AlgorithmMismatch {
                expected: self.spec.key_spec.name(),
                actual: message.algorithm().name(),
            });
        }
        Ok(())
    }

    fn kdf_info(&self) -> Vec<u8> {
        let mut info = Vec::new();
        info.extend_from_slice(KDF_LABEL);
        info.push(self.spec.variant.wire_byte());
        info.extend_from_slice(&self.spec.key_spec.wire_id());
        info
    }

    fn derive_secret(&self, raw: &Zeroizing<Vec<u8>>) -> Result<Zeroizing<Vec<u8>>> {
        kdf::derive(&self.spec.kdf, raw, &self.kdf_info())
    }

    fn generate_ephemeral(&self, spec: &AlgorithmSpec) -> Result<KeyPair> {
        Ok(self.keys.generator(spec)?.generate_key_pair()?)
    }

    /// Build the one-shot ClientHello and compute the initiator's raw value
    fn one_shot_hello(&self, peer: &PublicKey) -> Result<(AgreementMessage, Zeroizing<Vec<u8>>)> {
        let mut message =
            AgreementMessage::new(MessageKind::ClientHello, self.spec.key_spec.clone());
        let raw = match (&self.spec.key_spec, peer.material()) {
            (AlgorithmSpec::MlKem(level), PublicKeyMaterial::MlKem(pk)) => {
                let (ciphertext, shared) = mlkem::encapsulate(*level, pk)?;
                message = message.with_ciphertext(ciphertext);
                shared
            }
            (AlgorithmSpec::Composite(parts), PublicKeyMaterial::Composite(components)) => {
                let (dh_index, kem_index) = self
                    .spec
                    .hybrid_components()
                    .ok_or_else(|| Error::KeyPairMismatch("not a hybrid composite".to_string()))?;
                if components.len() != parts.len() {
                    return Err(Error::KeyPairMismatch(
                        "composite public key has the wrong component count".to_string(),
                    ));
                }

                let ephemeral = self.generate_ephemeral(&parts[dh_index])?;
                let dh_raw = agree_keys(
                    require_private(&ephemeral)?,
                    &components[dh_index],
                )?;

                let level = match &parts[kem_index] {
                    AlgorithmSpec::MlKem(level) => *level,
                    _ => unreachable!("hybrid_components located the KEM part"),
                };
                let kem_public = components[kem_index].raw_bytes();
                let (ciphertext, kem_raw) = mlkem::encapsulate(level, &kem_public)?;

                message = message
                    .with_ephemeral_public(ephemeral.public().raw_bytes())
                    .with_ciphertext(ciphertext);
                let mut raw = Zeroizing::new(Vec::with_capacity(dh_raw.len() + kem_raw.len()));
                raw.extend_from_slice(&dh_raw);
                raw.extend_from_slice(&kem_raw);
                raw
            }
            _ => {
                // Plain DH family: fresh ephemeral against the static peer.
                let ephemeral = self.generate_ephemeral(&self.spec.key_spec)?;
                let raw = agree_keys(require_private(&ephemeral)?, peer)?;
                message = message.with_ephemeral_public(ephemeral.public().raw_bytes());
                raw
            }
        };
        Ok((message, raw))
    }

    /// Compute the responder's raw value for a one-shot ClientHello
    fn one_shot_accept(
        &self,
        own_private: &PrivateKey,
        message: &AgreementMessage,
    ) -> Result<Zeroizing<Vec<u8>>> {
        match (&self.spec.key_spec, own_private.material()) {
            (AlgorithmSpec::MlKem(level), PrivateKeyMaterial::MlKem(sk)) => {
                let ciphertext = message.ciphertext().ok_or_else(|| {
                    Error::MessageFormat("KEM ClientHello carries no ciphertext".to_string())
                })?;
                mlkem::decapsulate(*level, sk, ciphertext).map_err(Error::from)
            }
            (AlgorithmSpec::Composite(parts), PrivateKeyMaterial::Composite(privates)) => {
                let (dh_index, kem_index) = self
                    .spec
                    .hybrid_components()
                    .ok_or_else(|| Error::KeyPairMismatch("not a hybrid composite".to_string()))?;
                if privates.len() != parts.len() {
                    return Err(Error::KeyPairMismatch(
                        "composite private key has the wrong component count".to_string(),
                    ));
                }

                let ephemeral_bytes = message.ephemeral_public().ok_or_else(|| {
                    Error::MessageFormat("hybrid ClientHello carries no ephemeral key".to_string())
                })?;
                let peer_ephemeral = PublicKey::from_raw(&parts[dh_index], ephemeral_bytes)
                    .map_err(Error::from)?;
                let dh_raw = agree_keys(&privates[dh_index], &peer_ephemeral)?;

                let ciphertext = message.ciphertext().ok_or_else(|| {
                    Error::MessageFormat("hybrid ClientHello carries no ciphertext".to_string())
                })?;
                let level = match &parts[kem_index] {
                    AlgorithmSpec::MlKem(level) => *level,
                    _ => unreachable!("hybrid_components located the KEM part"),
                };
                let kem_raw = match privates[kem_index].material() {
                    PrivateKeyMaterial::MlKem(sk) => mlkem::decapsulate(level, sk, ciphertext)?,
                    _ => {
                        return Err(Error::KeyPairMismatch(
                            "composite KEM component has the wrong material".to_string(),
                        ))
                    }
                };

                let mut raw = Zeroizing::new(Vec::with_capacity(dh_raw.len() + kem_raw.len()));
                raw.extend_from_slice(&dh_raw);
                raw.extend_from_slice(&kem_raw);
                Ok(raw)
            }
            _ => {
                let ephemeral_bytes = message.ephemeral_public().ok_or_else(|| {
                    Error::MessageFormat("ClientHello carries no ephemeral key".to_string())
                })?;
                let peer_ephemeral =
                    PublicKey::from_raw(&self.spec.key_spec, ephemeral_bytes)
                        .map_err(Error::from)?;
                agree_keys(own_private, &peer_ephemeral)
            }
        }
    }
}

impl Drop for Agreement {
    fn drop(&mut self) {
        // Zeroizing buffers erase themselves; dropping the handles here
        // keeps retired sessions from lingering with live key material.
        self.secret = None;
        self.ephemeral = None;
    }
}

fn require_static(pair: Option<Arc<KeyPair>>, variant: AgreementVariant) -> Result<Arc<KeyPair>> {
    pair.ok_or_else(|| {
        Error::ProtocolState(format!(
            "the {} variant requires a static key pair",
            variant.as_str()
        ))
    })
}

fn require_private(pair: &KeyPair) -> Result<&PrivateKey> {
    pair.private()
        .ok_or_else(|| Error::KeyPairMismatch("key pair has no private key".to_string()))
}

/// Two-key Diffie-Hellman dispatch over the material variants
fn agree_keys(private: &PrivateKey, public: &PublicKey) -> Result<Zeroizing<Vec<u8>>> {
    match (private.material(), public.material()) {
        (PrivateKeyMaterial::X25519(sk), PublicKeyMaterial::X25519(pk)) => {
            x25519::agree(sk, pk).map_err(Error::from)
        }
        (PrivateKeyMaterial::P256(sk), PublicKeyMaterial::P256(pk)) => {
            ec::agree_p256(sk, pk).map_err(Error::from)
        }
        (PrivateKeyMaterial::Secp256k1(sk), PublicKeyMaterial::Secp256k1(pk)) => {
            ec::agree_k256(sk, pk).map_err(Error::from)
        }
        _ => Err(Error::KeyPairMismatch(format!(
            "{} and {} cannot run a Diffie-Hellman agreement",
            private.spec().name(),
            public.spec().name()
        ))),
    }
}

/// Unified or MQV combination over static and ephemeral key material
fn combine(
    variant: AgreementVariant,
    own_static: &KeyPair,
    own_ephemeral: &KeyPair,
    peer_static: &PublicKey,
    peer_ephemeral: &PublicKey,
) -> Result<Zeroizing<Vec<u8>>> {
    let static_private = require_private(own_static)?;
    let ephemeral_private = require_private(own_ephemeral)?;
    match variant {
        AgreementVariant::Unified => {
            // Z = Ze || Zs: the ephemeral component leads so it dominates
            // the derivation.
            let ze = agree_keys(ephemeral_private, peer_ephemeral)?;
            let zs = agree_keys(static_private, peer_static)?;
            let mut raw = Zeroizing::new(Vec::with_capacity(ze.len() + zs.len()));
            raw.extend_from_slice(&ze);
            raw.extend_from_slice(&zs);
            Ok(raw)
        }
        AgreementVariant::Mqv => match (
            static_private.material(),
            ephemeral_private.material(),
            own_ephemeral.public().material(),
            peer_static.material(),
            peer_ephemeral.material(),
        ) {
            (
                PrivateKeyMaterial::P256(static_sk),
                PrivateKeyMaterial::P256(ephemeral_sk),
                PublicKeyMaterial::P256(own_ephemeral_pk),
                PublicKeyMaterial::P256(peer_static_pk),
                PublicKeyMaterial::P256(peer_ephemeral_pk),
            ) => ec::agree_mqv_p256(
                static_sk,
                ephemeral_sk,
                own_ephemeral_pk,
                peer_static_pk,
                peer_ephemeral_pk,
            )
            .map_err(Error::from),
            (
                PrivateKeyMaterial::Secp256k1(static_sk),
                PrivateKeyMaterial::Secp256k1(ephemeral_sk),
                PublicKeyMaterial::Secp256k1(own_ephemeral_pk),
                PublicKeyMaterial::Secp256k1(peer_static_pk),
                PublicKeyMaterial::Secp256k1(peer_ephemeral_pk),
            ) => ec::agree_mqv_k256(
                static_sk,
                ephemeral_sk,
                own_ephemeral_pk,
                peer_static_pk,
                peer_ephemeral_pk,
            )
            .map_err(Error::from),
            _ => Err(Error::KeyPairMismatch(
                "MQV requires matching Weierstrass curve keys".to_string(),
            )),
        },
        _ => Err(Error::ProtocolState(format!(
            "the {} variant has no combined agreement",
            variant.as_str()
        ))),
    }
}

/// Sign a handshake transcript with a stateless signing key
fn sign_transcript(pair: &KeyPair, transcript: &[u8]) -> Result<Vec<u8>> {
    let private = require_private(pair)?;
    match private.material() {
        PrivateKeyMaterial::Ed25519(sk) => Ok(kap_keys::primitives::ed25519::sign(sk, transcript)),
        PrivateKeyMaterial::P256(sk) => ec::sign_p256(sk, transcript).map_err(Error::from),
        PrivateKeyMaterial::Secp256k1(sk) => ec::sign_k256(sk, transcript).map_err(Error::from),
        _ => Err(Error::KeyPairMismatch(format!(
            "{} keys cannot sign handshake transcripts",
            pair.spec().name()
        ))),
    }
}

/// Confirmation tag: HMAC-SHA256 over the transcript keyed by the secret
fn confirmation_tag(secret: &[u8], transcript: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(CONFIRM_LABEL);
    mac.update(transcript);
    mac.finalize().into_bytes().to_vec()
}

fn decode_ephemeral(spec: &AlgorithmSpec, message: &AgreementMessage) -> Result<PublicKey> {
    let bytes = message.ephemeral_public().ok_or_else(|| {
        Error::MessageFormat("message carries no ephemeral public key".to_string())
    })?;
    PublicKey::from_raw(spec, bytes).map_err(Error::from)
}
