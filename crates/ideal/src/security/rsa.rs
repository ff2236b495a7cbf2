use std::path::Path;

use rsa::RsaPublicKey;
use rsa::pkcs1v15::{SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use sha2::Sha256;

use super::algorithm::RSA_SHA256;
use super::certificate::Certificate;
use super::key::PrivateKey;
use super::signer::MessageSigner;
use crate::error::{IdealError, Result};

/// RSA PKCS#1 v1.5 signer with SHA-256 digest.
///
/// Pairs the merchant's private key with its certificate; the certificate
/// fingerprint becomes the `KeyName` of every signature.
pub struct RsaSigner {
    signing_key: SigningKey<Sha256>,
    key_name: String,
}

impl RsaSigner {
    pub fn new(private_key: &PrivateKey, certificate: &Certificate) -> Self {
        Self {
            signing_key: SigningKey::<Sha256>::new(private_key.rsa().clone()),
            key_name: certificate.fingerprint(),
        }
    }

    /// Load the key and certificate files and build a signer from them.
    pub fn from_files(
        private_key: impl AsRef<Path>,
        password: &str,
        certificate: impl AsRef<Path>,
    ) -> Result<Self> {
        let key = PrivateKey::from_file(private_key, password)?;
        let cert = Certificate::from_file(certificate)?;
        Ok(Self::new(&key, &cert))
    }
}

impl MessageSigner for RsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| IdealError::Key(format!("RSA signing failed: {e}")))?;
        Ok(signature.to_vec())
    }

    fn key_name(&self) -> &str {
        &self.key_name
    }

    fn algorithm(&self) -> &str {
        RSA_SHA256
    }
}

/// Check an RSA PKCS#1 v1.5 / SHA-256 signature.
pub fn verify_rsa_sha256(public_key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool {
    let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature) else {
        return false;
    };
    VerifyingKey::<Sha256>::new(public_key.clone())
        .verify(data, &signature)
        .is_ok()
}
