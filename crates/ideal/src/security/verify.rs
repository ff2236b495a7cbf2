use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use roxmltree::{Document, Node};
use tracing::debug;

use super::algorithm::{DigestMethod, EXC_C14N, RSA_SHA256, XMLDSIG_NS};
use super::c14n;
use super::certificate::Certificate;
use super::rsa::verify_rsa_sha256;
use super::sign::{digest, signed_content};
use crate::error::{IdealError, Result};

/// Checks signed messages against an ordered list of trusted certificates.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    trusted: Vec<Certificate>,
}

impl Verifier {
    pub fn new(trusted: Vec<Certificate>) -> Self {
        Self { trusted }
    }

    pub fn from_files<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let trusted = paths
            .into_iter()
            .map(Certificate::from_file)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(trusted))
    }

    pub fn trusted(&self) -> &[Certificate] {
        &self.trusted
    }

    pub fn verify(&self, xml_document: impl AsRef<[u8]>) -> Result<bool> {
        verify(xml_document, &self.trusted)
    }
}

/// Return `true` if `xml_document` carries a valid signature by one of `trusted`.
///
/// Malformed XML, or a document without `Signature/SignedInfo`, is an error.
/// Every other failure is reported as `false`, without saying which check failed.
pub fn verify(xml_document: impl AsRef<[u8]>, trusted: &[Certificate]) -> Result<bool> {
    let text = std::str::from_utf8(xml_document.as_ref())
        .map_err(|e| IdealError::Parse(format!("document is not UTF-8: {e}")))?;
    let doc = Document::parse(text)?;

    let signature = dsig_child(doc.root_element(), "Signature")
        .ok_or_else(|| IdealError::MissingElement("Signature".into()))?;
    let signed_info = dsig_child(signature, "SignedInfo")
        .ok_or_else(|| IdealError::MissingElement("Signature/SignedInfo".into()))?;

    match check_signature(text, signature, signed_info, trusted) {
        Ok(()) => Ok(true),
        Err(reason) => {
            debug!(reason, "signature rejected");
            Ok(false)
        }
    }
}

fn check_signature(
    text: &str,
    signature: Node<'_, '_>,
    signed_info: Node<'_, '_>,
    trusted: &[Certificate],
) -> std::result::Result<(), &'static str> {
    let unsigned = unsigned_message(text, signature);

    let reference = dsig_child(signed_info, "Reference").ok_or("missing Reference")?;
    let method = dsig_child(reference, "DigestMethod")
        .and_then(|node| node.attribute("Algorithm"))
        .ok_or("missing DigestMethod")?;
    let method = DigestMethod::from_uri(method).map_err(|_| "unsupported digest method")?;
    let expected_digest = dsig_text(reference, "DigestValue").ok_or("missing DigestValue")?;
    if expected_digest.trim() != digest(&unsigned, method) {
        return Err("digest mismatch");
    }

    let key_name = signature
        .children()
        .find(|node| is_dsig(*node, "KeyInfo"))
        .and_then(|key_info| dsig_text(key_info, "KeyName"))
        .ok_or("missing KeyName")?;
    let key_name = key_name.trim();
    let certificate = trusted
        .iter()
        .find(|cert| cert.fingerprint().eq_ignore_ascii_case(key_name))
        .ok_or("no trusted certificate matches KeyName")?;

    let c14n_method = dsig_child(signed_info, "CanonicalizationMethod")
        .and_then(|node| node.attribute("Algorithm"));
    if c14n_method != Some(EXC_C14N) {
        return Err("unsupported canonicalization method");
    }
    let signature_method = dsig_child(signed_info, "SignatureMethod")
        .and_then(|node| node.attribute("Algorithm"));
    if signature_method != Some(RSA_SHA256) {
        return Err("unsupported signature method");
    }
    // Transforms are not applied; the message profile only ever lists enveloped-signature.
    let canonical = c14n::canonicalize(signed_info).map_err(|_| "canonicalization failed")?;

    let signature_value = dsig_text(signature, "SignatureValue").ok_or("missing SignatureValue")?;
    let signature_value: String = signature_value.chars().filter(|c| !c.is_whitespace()).collect();
    let signature_bytes = STANDARD
        .decode(signature_value)
        .map_err(|_| "SignatureValue is not base64")?;

    let public_key = certificate.public_key().map_err(|_| "certificate has no RSA key")?;
    if verify_rsa_sha256(&public_key, &canonical, &signature_bytes) {
        Ok(())
    } else {
        Err("bad signature")
    }
}

/// The message as it was before signing.
fn unsigned_message(text: &str, signature: Node<'_, '_>) -> String {
    signed_content(text, signature.document(), Some(signature.range()))
}

fn is_dsig(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(XMLDSIG_NS)
}

fn dsig_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_dsig(*child, name))
}

fn dsig_text<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<&'a str> {
    dsig_child(node, name).map(|child| child.text().unwrap_or(""))
}
