//! Agreement message codec
//!
//! Handshake messages travel as a compact self-describing binary record:
//! the length-prefixed algorithm identifier, a one-byte message kind, a
//! presence-flag byte, and each present payload field prefixed with a
//! big-endian u32 length. Encoding is deterministic and carries no padding
//! beyond the declared length prefixes; decoding consumes the input exactly
//! and validates the algorithm identifier before exposing any payload.

use crate::error::{Error, Result};
use kap_keys::AlgorithmSpec;

const FLAG_EPHEMERAL: u8 = 0b0001;
const FLAG_CIPHERTEXT: u8 = 0b0010;
const FLAG_SIGNATURE: u8 = 0b0100;
const FLAG_CONFIRMATION: u8 = 0b1000;
const FLAG_ALL: u8 = FLAG_EPHEMERAL | FLAG_CIPHERTEXT | FLAG_SIGNATURE | FLAG_CONFIRMATION;

/// The three handshake message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Opens the handshake; may carry ephemeral key or ciphertext
    ClientHello,
    /// Responder's reply; may carry ephemeral key and signature
    ServerHello,
    /// Initiator's confirmation tag over the transcript
    ClientConfirm,
}

impl MessageKind {
    /// Wire byte of the kind
    pub fn as_u8(&self) -> u8 {
        match self {
            MessageKind::ClientHello => 1,
            MessageKind::ServerHello => 2,
            MessageKind::ClientConfirm => 3,
        }
    }

    fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(MessageKind::ClientHello),
            2 => Ok(MessageKind::ServerHello),
            3 => Ok(MessageKind::ClientConfirm),
            other => Err(Error::MessageFormat(format!(
                "unknown message kind: {:#04x}",
                other
            ))),
        }
    }
}

/// One handshake message
#[derive(Debug, Clone, PartialEq)]
pub struct AgreementMessage {
    kind: MessageKind,
    algorithm: AlgorithmSpec,
    ephemeral_public: Option<Vec<u8>>,
    ciphertext: Option<Vec<u8>>,
    signature: Option<Vec<u8>>,
    confirmation_tag: Option<Vec<u8>>,
}

impl AgreementMessage {
    /// Create an empty message of the given kind and algorithm
    pub fn new(kind: MessageKind, algorithm: AlgorithmSpec) -> Self {
        Self {
            kind,
            algorithm,
            ephemeral_public: None,
            ciphertext: None,
            signature: None,
            confirmation_tag: None,
        }
    }

    /// The message kind
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The algorithm this message belongs to
    pub fn algorithm(&self) -> &AlgorithmSpec {
        &self.algorithm
    }

    /// Embedded ephemeral public key bytes, when present
    pub fn ephemeral_public(&self) -> Option<&[u8]> {
        self.ephemeral_public.as_deref()
    }

    /// Encapsulated ciphertext bytes, when present
    pub fn ciphertext(&self) -> Option<&[u8]> {
        self.ciphertext.as_deref()
    }

    /// Transcript signature bytes, when present
    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    /// Confirmation tag bytes, when present
    pub fn confirmation_tag(&self) -> Option<&[u8]> {
        self.confirmation_tag.as_deref()
    }

    /// Attach an ephemeral public key
    pub fn with_ephemeral_public(mut self, bytes: Vec<u8>) -> Self {
        self.ephemeral_public = Some(bytes);
        self
    }

    /// Attach an encapsulated ciphertext
    pub fn with_ciphertext(mut self, bytes: Vec<u8>) -> Self {
        self.ciphertext = Some(bytes);
        self
    }

    /// Attach a transcript signature
    pub fn with_signature(mut self, bytes: Vec<u8>) -> Self {
        self.signature = Some(bytes);
        self
    }

    /// Attach a confirmation tag
    pub fn with_confirmation_tag(mut self, bytes: Vec<u8>) -> Self {
        self.confirmation_tag = Some(bytes);
        self
    }

    /// Encode the message to its wire form
    pub fn encode(&self) -> Vec<u8> {
        self.encode_inner(true)
    }

    /// Encode with the signature field omitted
    ///
    /// Both sides sign and verify this form, so the signature never covers
    /// itself.
    pub fn encode_unsigned(&self) -> Vec<u8> {
        self.encode_inner(false)
    }

    fn encode_inner(&self, include_signature: bool) -> Vec<u8> {
        let alg_id = self.algorithm.wire_id();
        let signature = if include_signature {
            self.signature.as_deref()
        } else {
            None
        };

        let mut flags = 0u8;
        if self.ephemeral_public.is_some() {
            flags |= FLAG_EPHEMERAL;
        }
        if self.ciphertext.is_some() {
            flags |= FLAG_CIPHERTEXT;
        }
        if signature.is_some() {
            flags |= FLAG_SIGNATURE;
        }
        if self.confirmation_tag.is_some() {
            flags |= FLAG_CONFIRMATION;
        }

        let mut out = Vec::new();
        out.push(alg_id.len() as u8);
        out.extend_from_slice(&alg_id);
        out.push(self.kind.as_u8());
        out.push(flags);
        for field in [
            self.ephemeral_public.as_deref(),
            self.ciphertext.as_deref(),
            signature,
            self.confirmation_tag.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            out.extend_from_slice(&(field.len() as u32).to_be_bytes());
            out.extend_from_slice(field);
        }
        out
    }

    /// Decode a message, validating the algorithm against `expected`
    ///
    /// The algorithm identifier is checked before any payload field is
    /// exposed; a mismatch fails with [`Error::AlgorithmMismatch`].
    pub fn decode(bytes: &[u8], expected: &AlgorithmSpec) -> Result<Self> {
        let mut reader = Reader::new(bytes);

        let alg_len = reader.read_u8()? as usize;
        let alg_bytes = reader.read_slice(alg_len)?;
        let algorithm = AlgorithmSpec::from_wire_id(alg_bytes)
            .map_err(|e| Error::MessageFormat(format!("bad algorithm identifier: {}", e)))?;
        if &algorithm != expected {
            return Err(Error::AlgorithmMismatch {
                expected: expected.name(),
                actual: algorithm.name(),
            });
        }

        let kind = MessageKind::from_u8(reader.read_u8()?)?;
        let flags = reader.read_u8()?;
        if flags & !FLAG_ALL != 0 {
            return Err(Error::MessageFormat(format!(
                "unknown flag bits: {:#04x}",
                flags
            )));
        }

        let mut message = AgreementMessage::new(kind, algorithm);
        if flags & FLAG_EPHEMERAL != 0 {
            message.ephemeral_public = Some(reader.read_field()?);
        }
        if flags & FLAG_CIPHERTEXT != 0 {
            message.ciphertext = Some(reader.read_field()?);
        }
        if flags & FLAG_SIGNATURE != 0 {
            message.signature = Some(reader.read_field()?);
        }
        if flags & FLAG_CONFIRMATION != 0 {
            message.confirmation_tag = Some(reader.read_field()?);
        }
        reader.expect_end()?;
        Ok(message)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| Error::MessageFormat("truncated message".to_string()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + len)
            .ok_or_else(|| Error::MessageFormat("truncated message".to_string()))?;
        self.pos += len;
        Ok(slice)
    }

    fn read_field(&mut self) -> Result<Vec<u8>> {
        let len_bytes = self.read_slice(4)?;
        let len = u32::from_be_bytes(len_bytes.try_into().expect("sliced 4 bytes")) as usize;
        Ok(self.read_slice(len)?.to_vec())
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(Error::MessageFormat(
                "trailing bytes after message".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use kap_keys::{EcCurve, MlKemLevel};

    fn spec() -> AlgorithmSpec {
        AlgorithmSpec::Ec(EcCurve::P256)
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let message = AgreementMessage::new(MessageKind::ServerHello, spec())
            .with_ephemeral_public(vec![0xAA; 65])
            .with_signature(vec![0xBB; 64]);
        let encoded = message.encode();
        let decoded = AgreementMessage::decode(&encoded, &spec()).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let message = AgreementMessage::new(MessageKind::ClientHello, spec())
            .with_ephemeral_public(vec![1, 2, 3]);
        assert_eq!(message.encode(), message.encode());
    }

    #[test]
    fn test_bare_message_roundtrip() {
        let message = AgreementMessage::new(MessageKind::ClientHello, spec());
        let decoded = AgreementMessage::decode(&message.encode(), &spec()).unwrap();
        assert_eq!(decoded.ephemeral_public(), None);
        assert_eq!(decoded.ciphertext(), None);
        assert_eq!(decoded.signature(), None);
        assert_eq!(decoded.confirmation_tag(), None);
    }

    #[test]
    fn test_decode_rejects_algorithm_mismatch() {
        let message = AgreementMessage::new(MessageKind::ClientHello, spec());
        let other = AlgorithmSpec::MlKem(MlKemLevel::MlKem768);
        assert_matches!(
            AgreementMessage::decode(&message.encode(), &other),
            Err(Error::AlgorithmMismatch { .. })
        );
    }

    #[test]
    fn test_decode_rejects_truncation_and_trailing() {
        let message = AgreementMessage::new(MessageKind::ClientHello, spec())
            .with_ciphertext(vec![5; 32]);
        let mut encoded = message.encode();

        let truncated = &encoded[..encoded.len() - 1];
        assert_matches!(
            AgreementMessage::decode(truncated, &spec()),
            Err(Error::MessageFormat(_))
        );

        encoded.push(0);
        assert_matches!(
            AgreementMessage::decode(&encoded, &spec()),
            Err(Error::MessageFormat(_))
        );
    }

    #[test]
    fn test_decode_rejects_unknown_kind_and_flags() {
        let encoded = AgreementMessage::new(MessageKind::ClientHello, spec()).encode();

        let mut bad_kind = encoded.clone();
        let kind_pos = 1 + spec().wire_id().len();
        bad_kind[kind_pos] = 9;
        assert_matches!(
            AgreementMessage::decode(&bad_kind, &spec()),
            Err(Error::MessageFormat(_))
        );

        let mut bad_flags = encoded;
        bad_flags[kind_pos + 1] = 0xF0;
        assert_matches!(
            AgreementMessage::decode(&bad_flags, &spec()),
            Err(Error::MessageFormat(_))
        );
    }

    #[test]
    fn test_unsigned_encoding_omits_signature_only() {
        let message = AgreementMessage::new(MessageKind::ServerHello, spec())
            .with_ephemeral_public(vec![7; 65])
            .with_signature(vec![9; 64]);
        let unsigned = message.encode_unsigned();
        let decoded = AgreementMessage::decode(&unsigned, &spec()).unwrap();
        assert_eq!(decoded.signature(), None);
        assert_eq!(decoded.ephemeral_public(), message.ephemeral_public());
    }
}
