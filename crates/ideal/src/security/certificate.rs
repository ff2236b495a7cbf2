use std::path::Path;

use rsa::RsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use sha1::{Digest, Sha1};
use x509_cert::der::{Decode, Encode};

use crate::error::{IdealError, Result};

/// An X.509 certificate, kept as its DER encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Load a PEM or DER certificate from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let trimmed = data.trim_ascii();
        if trimmed.starts_with(b"-----BEGIN") {
            Self::from_pem(trimmed)
        } else {
            Self::from_der(data)
        }
    }

    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let (label, der) = pem_rfc7468::decode_vec(pem.trim_ascii())
            .map_err(|e| IdealError::Certificate(format!("failed to decode certificate PEM: {e}")))?;
        if label != "CERTIFICATE" {
            return Err(IdealError::Certificate(format!(
                "expected CERTIFICATE PEM label, got: {label}"
            )));
        }
        Self::from_der(&der)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        x509_cert::Certificate::from_der(der)
            .map_err(|e| IdealError::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        Ok(Self { der: der.to_vec() })
    }

    /// Read a certificate file. The file is closed before this returns.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The SHA-1 fingerprint, used as `KeyName` in signatures.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.der)
    }

    pub fn public_key(&self) -> Result<RsaPublicKey> {
        let cert = x509_cert::Certificate::from_der(&self.der)
            .map_err(|e| IdealError::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        let spki = cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| IdealError::Certificate(format!("failed to encode SPKI: {e}")))?;
        RsaPublicKey::from_public_key_der(&spki)
            .map_err(|e| IdealError::Certificate(format!("certificate does not hold an RSA key: {e}")))
    }
}

/// Lowercase hex SHA-1 of `der`, left-padded with zeros to 40 characters.
pub fn fingerprint(der: &[u8]) -> String {
    let hex = hex::encode(Sha1::digest(der));
    format!("{hex:0>40}")
}
