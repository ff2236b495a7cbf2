use std::fmt;
use std::path::Path;

use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;

use crate::error::{IdealError, Result};

const ENCRYPTED_PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const LEGACY_ENCRYPTION_HEADER: &str = "Proc-Type: 4,ENCRYPTED";

/// An unlocked RSA signing key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    /// Load a PEM private key, unlocking it with `password` when it is encrypted.
    ///
    /// Accepts encrypted PKCS#8, plain PKCS#8 and PKCS#1 keys.
    pub fn from_pem(pem: &[u8], password: &str) -> Result<Self> {
        let pem = std::str::from_utf8(pem)
            .map_err(|e| IdealError::Key(format!("invalid PEM encoding: {e}")))?
            .trim();

        if pem.contains(ENCRYPTED_PKCS8_LABEL) {
            let inner = RsaPrivateKey::from_pkcs8_encrypted_pem(pem, password.as_bytes())
                .map_err(|e| IdealError::KeyUnlock(e.to_string()))?;
            return Ok(Self { inner });
        }

        if pem.contains(LEGACY_ENCRYPTION_HEADER) {
            return Err(IdealError::Key(
                "legacy OpenSSL-encrypted PEM is not supported, convert it with `openssl pkcs8 -topk8`".into(),
            ));
        }

        if let Ok(inner) = RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(Self { inner });
        }
        RsaPrivateKey::from_pkcs1_pem(pem)
            .map(|inner| Self { inner })
            .map_err(|e| IdealError::Key(format!("unrecognised RSA private key: {e}")))
    }

    /// Read a key file. The file is closed before this returns.
    pub fn from_file(path: impl AsRef<Path>, password: &str) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_pem(&data, password)
    }

    pub(crate) fn rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(inner: RsaPrivateKey) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}
