pub mod algorithm;
pub mod c14n;
mod certificate;
mod key;
mod rsa;
mod sign;
mod signer;
mod template;
mod verify;

pub use algorithm::DigestMethod;
pub use certificate::{Certificate, fingerprint};
pub use key::PrivateKey;
pub use self::rsa::{RsaSigner, verify_rsa_sha256};
pub use sign::{build_signed_info, digest, digest_with_uri, sign, sign_message, sign_message_with_files};
pub use signer::MessageSigner;
pub use verify::{Verifier, verify};
