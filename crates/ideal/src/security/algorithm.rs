//! Algorithm identifiers used by the iDEAL signature profile.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{IdealError, Result};

pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const IDEAL_NS: &str = "http://www.idealdesk.com/ideal/messages/mer-acq/3.3.1";

pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// Digest methods accepted in `Reference/DigestMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestMethod {
    Sha1,
    #[default]
    Sha256,
}

const DIGEST_METHODS: &[(&str, DigestMethod)] = &[
    ("sha1", DigestMethod::Sha1),
    ("sha256", DigestMethod::Sha256),
];

impl DigestMethod {
    /// Resolve a digest method from an algorithm URI or a bare name.
    ///
    /// Only the part after the last `#` is considered, so both
    /// `http://www.w3.org/2001/04/xmlenc#sha256` and `sha256` resolve.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let name = uri.rsplit('#').next().unwrap_or(uri);
        DIGEST_METHODS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, method)| *method)
            .ok_or_else(|| IdealError::UnsupportedAlgorithm(format!("digest method: {uri}")))
    }

    pub fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => SHA1,
            Self::Sha256 => SHA256,
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}
