//! Standard key-encoding containers
//!
//! Produces and consumes the two standard containers: PKCS#8
//! `PrivateKeyInfo` (RFC 5208) for private keys and X.509
//! `SubjectPublicKeyInfo` (RFC 5280) for public keys, with the RFC 8410
//! forms for the 25519 family and RFC 5915 `ECPrivateKey` for the
//! Weierstrass curves. The DER subset needed here (SEQUENCE, INTEGER,
//! OCTET STRING, BIT STRING, context tag [1]) is written and read with
//! fixed templates per algorithm family.

use crate::error::{Error, Result};
use crate::keypair::{PrivateKey, PrivateKeyMaterial, PublicKey, PublicKeyMaterial};
use crate::spec::{AlgorithmSpec, EcCurve, MlKemLevel};
use base64::Engine;
use zeroize::Zeroizing;

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_CONTEXT_1: u8 = 0xA1;

// AlgorithmIdentifier templates, complete TLV bytes.
const ALG_ID_X25519: &[u8] = &[0x30, 0x05, 0x06, 0x03, 0x2B, 0x65, 0x6E];
const ALG_ID_ED25519: &[u8] = &[0x30, 0x05, 0x06, 0x03, 0x2B, 0x65, 0x70];
const ALG_ID_EC_P256: &[u8] = &[
    0x30, 0x13, 0x06, 0x07, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01, 0x06, 0x08, 0x2A, 0x86,
    0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07,
];
const ALG_ID_EC_K256: &[u8] = &[
    0x30, 0x10, 0x06, 0x07, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01, 0x06, 0x05, 0x2B, 0x81,
    0x04, 0x00, 0x0A,
];
const ALG_ID_ML_KEM_512: &[u8] = &[
    0x30, 0x0B, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x04, 0x01,
];
const ALG_ID_ML_KEM_768: &[u8] = &[
    0x30, 0x0B, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x04, 0x02,
];
const ALG_ID_ML_KEM_1024: &[u8] = &[
    0x30, 0x0B, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x04, 0x03,
];
const ALG_ID_HSS: &[u8] = &[
    0x30, 0x0D, 0x06, 0x0B, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x10, 0x03, 0x11,
];
const ALG_ID_COMPOSITE: &[u8] = &[
    0x30, 0x0C, 0x06, 0x0A, 0x60, 0x86, 0x48, 0x01, 0x86, 0xFA, 0x6B, 0x50, 0x04, 0x01,
];

fn algorithm_identifier(spec: &AlgorithmSpec) -> &'static [u8] {
    match spec {
        AlgorithmSpec::X25519 => ALG_ID_X25519,
        AlgorithmSpec::Ed25519 => ALG_ID_ED25519,
        AlgorithmSpec::Ec(EcCurve::P256) => ALG_ID_EC_P256,
        AlgorithmSpec::Ec(EcCurve::Secp256k1) => ALG_ID_EC_K256,
        AlgorithmSpec::MlKem(MlKemLevel::MlKem512) => ALG_ID_ML_KEM_512,
        AlgorithmSpec::MlKem(MlKemLevel::MlKem768) => ALG_ID_ML_KEM_768,
        AlgorithmSpec::MlKem(MlKemLevel::MlKem1024) => ALG_ID_ML_KEM_1024,
        AlgorithmSpec::Hss(_) => ALG_ID_HSS,
        AlgorithmSpec::Composite(_) => ALG_ID_COMPOSITE,
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xFF {
        out.push(0x81);
        out.push(len as u8);
    } else {
        out.push(0x82);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    }
}

fn write_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    write_len(out, content.len());
    out.extend_from_slice(content);
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    write_tlv(&mut out, tag, content);
    out
}

/// Minimal DER reader over a byte slice
struct DerReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| Error::Encoding("truncated DER input".to_string()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_len(&mut self) -> Result<usize> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(first as usize);
        }
        let num_bytes = (first & 0x7F) as usize;
        if num_bytes == 0 || num_bytes > 2 {
            return Err(Error::Encoding(
                "unsupported DER length encoding".to_string(),
            ));
        }
        let mut len = 0usize;
        for _ in 0..num_bytes {
            len = (len << 8) | self.read_byte()? as usize;
        }
        Ok(len)
    }

    /// Read one TLV, checking the tag, and return its content slice
    fn read_tlv(&mut self, expected_tag: u8) -> Result<&'a [u8]> {
        let tag = self.read_byte()?;
        if tag != expected_tag {
            return Err(Error::Encoding(format!(
                "expected DER tag {:#04x}, found {:#04x}",
                expected_tag, tag
            )));
        }
        let len = self.read_len()?;
        let content = self
            .bytes
            .get(self.pos..self.pos + len)
            .ok_or_else(|| Error::Encoding("DER length exceeds input".to_string()))?;
        self.pos += len;
        Ok(content)
    }

    fn peek_tag(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn expect_end(&self) -> Result<()> {
        if !self.at_end() {
            return Err(Error::Encoding(
                "trailing bytes after DER structure".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_algorithm_identifier(spec: &AlgorithmSpec, found: &[u8]) -> Result<()> {
    let expected = algorithm_identifier(spec);
    if found != expected {
        return Err(Error::Encoding(format!(
            "algorithm identifier does not match spec {}",
            spec.name()
        )));
    }
    Ok(())
}

// Reads a complete TLV (tag, length, content) as raw bytes, for nested
// composite containers.
fn read_raw_tlv<'a>(reader: &mut DerReader<'a>) -> Result<&'a [u8]> {
    let start = reader.pos;
    let _tag = reader.read_byte()?;
    let len = reader.read_len()?;
    let end = reader.pos + len;
    if end > reader.bytes.len() {
        return Err(Error::Encoding("DER length exceeds input".to_string()));
    }
    reader.pos = end;
    Ok(&reader.bytes[start..end])
}

/// Encode a public key as X.509 SubjectPublicKeyInfo
pub fn encode_spki(public: &PublicKey) -> Result<Vec<u8>> {
    let key_bytes = match public.material() {
        PublicKeyMaterial::Composite(parts) => {
            let mut inner = Vec::new();
            for part in parts {
                inner.extend_from_slice(&encode_spki(part)?);
            }
            tlv(TAG_SEQUENCE, &inner)
        }
        _ => public.raw_bytes(),
    };

    let mut bit_string = Vec::with_capacity(key_bytes.len() + 1);
    bit_string.push(0x00);
    bit_string.extend_from_slice(&key_bytes);

    let mut body = Vec::new();
    body.extend_from_slice(algorithm_identifier(public.spec()));
    write_tlv(&mut body, TAG_BIT_STRING, &bit_string);
    Ok(tlv(TAG_SEQUENCE, &body))
}

/// Decode an X.509 SubjectPublicKeyInfo into a public key for `spec`
pub fn decode_spki(spec: &AlgorithmSpec, bytes: &[u8]) -> Result<PublicKey> {
    let mut outer = DerReader::new(bytes);
    let body = outer.read_tlv(TAG_SEQUENCE)?;
    outer.expect_end()?;

    let mut reader = DerReader::new(body);
    let alg_id = read_raw_tlv(&mut reader)?;
    check_algorithm_identifier(spec, alg_id)?;
    let bit_string = reader.read_tlv(TAG_BIT_STRING)?;
    reader.expect_end()?;

    let key_bytes = match bit_string.split_first() {
        Some((0x00, rest)) => rest,
        _ => {
            return Err(Error::Encoding(
                "public key BIT STRING must have zero unused bits".to_string(),
            ))
        }
    };

    match spec {
        AlgorithmSpec::Composite(parts) => {
            let mut inner = DerReader::new(key_bytes);
            let sequence = inner.read_tlv(TAG_SEQUENCE)?;
            inner.expect_end()?;
            let mut components = Vec::with_capacity(parts.len());
            let mut component_reader = DerReader::new(sequence);
            for part in parts {
                let component_der = read_raw_tlv(&mut component_reader)?;
                components.push(decode_spki(part, component_der)?);
            }
            component_reader.expect_end()?;
            Ok(PublicKey::new(
                spec.clone(),
                PublicKeyMaterial::Composite(components),
            ))
        }
        _ => PublicKey::from_raw(spec, key_bytes),
    }
}

/// Encode a private key as PKCS#8 PrivateKeyInfo
pub fn encode_pkcs8(private: &PrivateKey) -> Result<Vec<u8>> {
    let inner: Zeroizing<Vec<u8>> = Zeroizing::new(match private.material() {
        // RFC 8410: CurvePrivateKey is itself an OCTET STRING.
        PrivateKeyMaterial::X25519(sk) => tlv(TAG_OCTET_STRING, &sk.to_bytes()),
        PrivateKeyMaterial::Ed25519(sk) => tlv(TAG_OCTET_STRING, &sk.to_bytes()),
        // RFC 5915 ECPrivateKey with the public key attached as [1].
        PrivateKeyMaterial::P256(sk) => {
            use p256::elliptic_curve::sec1::ToEncodedPoint;
            let public = sk.public_key().to_encoded_point(false);
            ec_private_key(sk.to_bytes().as_slice(), public.as_bytes())
        }
        PrivateKeyMaterial::Secp256k1(sk) => {
            use p256::elliptic_curve::sec1::ToEncodedPoint;
            let public = sk.public_key().to_encoded_point(false);
            ec_private_key(sk.to_bytes().as_slice(), public.as_bytes())
        }
        PrivateKeyMaterial::MlKem(sk) => sk.to_vec(),
        PrivateKeyMaterial::Hss(sk) => sk.to_bytes(),
        PrivateKeyMaterial::Composite(parts) => {
            let mut sequence = Vec::new();
            for part in parts {
                sequence.extend_from_slice(&encode_pkcs8(part)?);
            }
            tlv(TAG_SEQUENCE, &sequence)
        }
    });

    let mut body = Vec::new();
    write_tlv(&mut body, TAG_INTEGER, &[0x00]);
    body.extend_from_slice(algorithm_identifier(private.spec()));
    write_tlv(&mut body, TAG_OCTET_STRING, &inner);
    Ok(tlv(TAG_SEQUENCE, &body))
}

fn ec_private_key(scalar: &[u8], public_point: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    write_tlv(&mut body, TAG_INTEGER, &[0x01]);
    write_tlv(&mut body, TAG_OCTET_STRING, scalar);
    let mut bit_string = Vec::with_capacity(public_point.len() + 1);
    bit_string.push(0x00);
    bit_string.extend_from_slice(public_point);
    let wrapped = tlv(TAG_BIT_STRING, &bit_string);
    write_tlv(&mut body, TAG_CONTEXT_1, &wrapped);
    tlv(TAG_SEQUENCE, &body)
}

/// Decode a PKCS#8 PrivateKeyInfo into a private key for `spec`
pub fn decode_pkcs8(spec: &AlgorithmSpec, bytes: &[u8]) -> Result<PrivateKey> {
    let mut outer = DerReader::new(bytes);
    let body = outer.read_tlv(TAG_SEQUENCE)?;
    outer.expect_end()?;

    let mut reader = DerReader::new(body);
    let version = reader.read_tlv(TAG_INTEGER)?;
    if version != [0x00] {
        return Err(Error::Encoding(format!(
            "unsupported PKCS#8 version: {}",
            hex::encode(version)
        )));
    }
    let alg_id = read_raw_tlv(&mut reader)?;
    check_algorithm_identifier(spec, alg_id)?;
    let inner = reader.read_tlv(TAG_OCTET_STRING)?;
    reader.expect_end()?;

    let material = match spec {
        AlgorithmSpec::X25519 => {
            let mut curve = DerReader::new(inner);
            let raw = curve.read_tlv(TAG_OCTET_STRING)?;
            curve.expect_end()?;
            PrivateKeyMaterial::X25519(crate::primitives::x25519::decode_private(raw)?)
        }
        AlgorithmSpec::Ed25519 => {
            let mut curve = DerReader::new(inner);
            let raw = curve.read_tlv(TAG_OCTET_STRING)?;
            curve.expect_end()?;
            PrivateKeyMaterial::Ed25519(crate::primitives::ed25519::decode_private(raw)?)
        }
        AlgorithmSpec::Ec(curve) => {
            let scalar = parse_ec_private_key(inner)?;
            match curve {
                EcCurve::P256 => {
                    PrivateKeyMaterial::P256(crate::primitives::ec::decode_private_p256(&scalar)?)
                }
                EcCurve::Secp256k1 => PrivateKeyMaterial::Secp256k1(
                    crate::primitives::ec::decode_private_k256(&scalar)?,
                ),
            }
        }
        AlgorithmSpec::MlKem(level) => {
            crate::primitives::mlkem::check_secret_len(*level, inner)?;
            PrivateKeyMaterial::MlKem(Zeroizing::new(inner.to_vec()))
        }
        AlgorithmSpec::Hss(params) => {
            let private = crate::stateful::HssPrivateKey::from_bytes(inner)?;
            if private.tree_height() != params.tree_height {
                return Err(Error::Encoding(format!(
                    "HSS private key height {} does not match spec height {}",
                    private.tree_height(),
                    params.tree_height
                )));
            }
            PrivateKeyMaterial::Hss(private)
        }
        AlgorithmSpec::Composite(parts) => {
            let mut wrapper = DerReader::new(inner);
            let sequence = wrapper.read_tlv(TAG_SEQUENCE)?;
            wrapper.expect_end()?;
            let mut components = Vec::with_capacity(parts.len());
            let mut component_reader = DerReader::new(sequence);
            for part in parts {
                let component_der = read_raw_tlv(&mut component_reader)?;
                components.push(decode_pkcs8(part, component_der)?);
            }
            component_reader.expect_end()?;
            PrivateKeyMaterial::Composite(components)
        }
    };
    Ok(PrivateKey::new(spec.clone(), material))
}

// RFC 5915 ECPrivateKey: SEQUENCE { INTEGER 1, OCTET STRING scalar,
// optional [1] public key }. The attached public key, when present, is
// ignored here; pairing is checked at the generator level.
fn parse_ec_private_key(bytes: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let mut outer = DerReader::new(bytes);
    let body = outer.read_tlv(TAG_SEQUENCE)?;
    outer.expect_end()?;

    let mut reader = DerReader::new(body);
    let version = reader.read_tlv(TAG_INTEGER)?;
    if version != [0x01] {
        return Err(Error::Encoding(format!(
            "unsupported ECPrivateKey version: {}",
            hex::encode(version)
        )));
    }
    let scalar = Zeroizing::new(reader.read_tlv(TAG_OCTET_STRING)?.to_vec());
    if reader.peek_tag() == Some(TAG_CONTEXT_1) {
        reader.read_tlv(TAG_CONTEXT_1)?;
    }
    reader.expect_end()?;
    Ok(scalar)
}

/// Wrap DER bytes in PEM armor with the given label
pub fn to_pem(label: &str, der: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(der);
    let mut out = format!("-----BEGIN {}-----\n", label);
    for chunk in encoded.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        out.push('\n');
    }
    out.push_str(&format!("-----END {}-----\n", label));
    out
}

/// Strip PEM armor with the given label and decode the DER bytes
pub fn from_pem(label: &str, pem: &str) -> Result<Vec<u8>> {
    let begin = format!("-----BEGIN {}-----", label);
    let end = format!("-----END {}-----", label);
    let start = pem
        .find(&begin)
        .ok_or_else(|| Error::Encoding(format!("missing '{}' header", begin)))?
        + begin.len();
    let stop = pem
        .find(&end)
        .ok_or_else(|| Error::Encoding(format!("missing '{}' footer", end)))?;
    if stop < start {
        return Err(Error::Encoding("PEM footer precedes header".to_string()));
    }
    let body: String = pem[start..stop]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(body)
        .map_err(|e| Error::Encoding(format!("invalid PEM base64: {}", e)))
}

/// PEM label for SubjectPublicKeyInfo containers
pub const PEM_PUBLIC_KEY: &str = "PUBLIC KEY";

/// PEM label for PKCS#8 containers
pub const PEM_PRIVATE_KEY: &str = "PRIVATE KEY";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{ec, ed25519, x25519};
    use assert_matches::assert_matches;

    #[test]
    fn test_x25519_spki_roundtrip() {
        let (_, pk) = x25519::generate();
        let public = PublicKey::new(AlgorithmSpec::X25519, PublicKeyMaterial::X25519(pk));
        let der = encode_spki(&public).unwrap();
        let decoded = decode_spki(&AlgorithmSpec::X25519, &der).unwrap();
        assert_eq!(public, decoded);
    }

    #[test]
    fn test_x25519_spki_has_rfc8410_prefix() {
        let (_, pk) = x25519::generate();
        let public = PublicKey::new(AlgorithmSpec::X25519, PublicKeyMaterial::X25519(pk));
        let der = encode_spki(&public).unwrap();
        assert_eq!(der.len(), 44);
        assert_eq!(&der[..12], &[0x30, 0x2A, 0x30, 0x05, 0x06, 0x03, 0x2B, 0x65, 0x6E, 0x03, 0x21, 0x00]);
    }

    #[test]
    fn test_ed25519_pkcs8_roundtrip() {
        let (sk, pk) = ed25519::generate();
        let private = PrivateKey::new(
            AlgorithmSpec::Ed25519,
            PrivateKeyMaterial::Ed25519(sk),
        );
        let der = encode_pkcs8(&private).unwrap();
        let decoded = decode_pkcs8(&AlgorithmSpec::Ed25519, &der).unwrap();
        match decoded.material() {
            PrivateKeyMaterial::Ed25519(sk) => assert_eq!(sk.verifying_key(), pk),
            other => panic!("unexpected material: {:?}", std::mem::discriminant(other)),
        }
    }

    #[test]
    fn test_ec_pkcs8_roundtrip() {
        let (sk, pk) = ec::generate_p256();
        let private = PrivateKey::new(
            AlgorithmSpec::Ec(EcCurve::P256),
            PrivateKeyMaterial::P256(sk),
        );
        let der = encode_pkcs8(&private).unwrap();
        let decoded = decode_pkcs8(&AlgorithmSpec::Ec(EcCurve::P256), &der).unwrap();
        match decoded.material() {
            PrivateKeyMaterial::P256(sk) => assert_eq!(sk.public_key(), pk),
            other => panic!("unexpected material: {:?}", std::mem::discriminant(other)),
        }
    }

    #[test]
    fn test_spki_rejects_wrong_spec() {
        let (_, pk) = x25519::generate();
        let public = PublicKey::new(AlgorithmSpec::X25519, PublicKeyMaterial::X25519(pk));
        let der = encode_spki(&public).unwrap();
        assert_matches!(
            decode_spki(&AlgorithmSpec::Ed25519, &der),
            Err(Error::Encoding(_))
        );
    }

    #[test]
    fn test_spki_rejects_trailing_bytes() {
        let (_, pk) = x25519::generate();
        let public = PublicKey::new(AlgorithmSpec::X25519, PublicKeyMaterial::X25519(pk));
        let mut der = encode_spki(&public).unwrap();
        der.push(0x00);
        assert_matches!(
            decode_spki(&AlgorithmSpec::X25519, &der),
            Err(Error::Encoding(_))
        );
    }

    #[test]
    fn test_pem_roundtrip() {
        let (_, pk) = x25519::generate();
        let public = PublicKey::new(AlgorithmSpec::X25519, PublicKeyMaterial::X25519(pk));
        let der = encode_spki(&public).unwrap();
        let pem = to_pem(PEM_PUBLIC_KEY, &der);
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        let recovered = from_pem(PEM_PUBLIC_KEY, &pem).unwrap();
        assert_eq!(der, recovered);
    }

    #[test]
    fn test_pem_rejects_wrong_label() {
        let pem = to_pem(PEM_PUBLIC_KEY, &[0x01, 0x02]);
        assert_matches!(
            from_pem(PEM_PRIVATE_KEY, &pem),
            Err(Error::Encoding(_))
        );
    }
}
