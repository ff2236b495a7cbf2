use std::ops::Range;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use roxmltree::Document;

use super::algorithm::{DigestMethod, RSA_SHA256};
use super::c14n;
use super::rsa::RsaSigner;
use super::signer::MessageSigner;
use super::template;
use crate::error::{IdealError, Result};

/// Base64 digest of the UTF-8 bytes of `message`.
pub fn digest(message: &str, method: DigestMethod) -> String {
    STANDARD.encode(method.digest(message.as_bytes()))
}

/// Like [`digest`], with the method named by URI (or its `#` suffix).
pub fn digest_with_uri(message: &str, method_uri: &str) -> Result<String> {
    Ok(digest(message, DigestMethod::from_uri(method_uri)?))
}

/// Render the `SignedInfo` block for a message digest.
pub fn build_signed_info(digest_value: &str) -> String {
    template::signed_info(digest_value, RSA_SHA256)
}

/// Canonicalize `signed_info` and return its base64 signature.
pub fn sign(signed_info: &str, signer: &dyn MessageSigner) -> Result<String> {
    let canonical = c14n::canonicalize_str(signed_info)?;
    Ok(STANDARD.encode(signer.sign(&canonical)?))
}

/// Sign an unsigned message.
///
/// The `Signature` element is spliced in before the last `<` of the message,
/// making it the last child of the root element. Everything before that point
/// is left untouched. The digest skips the XML declaration, processing
/// instructions and trailing newlines, the same way [`verify`](super::verify) does.
pub fn sign_message(message: &str, signer: &dyn MessageSigner) -> Result<String> {
    let (content, container_end) = message
        .rsplit_once('<')
        .ok_or_else(|| IdealError::Parse("message has no closing tag".into()))?;

    let doc = Document::parse(message)?;
    let digest_value = digest(&signed_content(message, &doc, None), DigestMethod::Sha256);
    let signed_info = template::signed_info(&digest_value, signer.algorithm());
    let signature_value = sign(&signed_info, signer)?;
    let signature = template::signature(&signed_info, &signature_value, signer.key_name());

    Ok([content, signature.as_str(), "<", container_end].concat())
}

/// The text a message digest is computed over: `text` without the `skip`
/// range (the `Signature` element, when verifying), without processing
/// instructions outside it and the newline after each, without a leading XML
/// declaration plus one newline, and without trailing newlines.
///
/// Works on the given text, never on a re-serialized tree.
pub(crate) fn signed_content(text: &str, doc: &Document<'_>, skip: Option<Range<usize>>) -> String {
    let mut cuts: Vec<Range<usize>> = skip.iter().cloned().collect();
    for pi in doc.root().descendants().filter(|node| node.is_pi()) {
        let mut range = pi.range();
        if skip.as_ref().is_some_and(|skip| range.start >= skip.start && range.end <= skip.end) {
            continue;
        }
        if text[range.end..].starts_with('\n') {
            range.end += 1;
        }
        cuts.push(range);
    }
    cuts.sort_by_key(|range| range.start);

    let mut kept = String::with_capacity(text.len());
    let mut position = 0;
    for cut in cuts {
        if cut.start > position {
            kept.push_str(&text[position..cut.start]);
        }
        position = position.max(cut.end);
    }
    kept.push_str(&text[position..]);

    strip_declaration(&kept).trim_end_matches('\n').to_owned()
}

fn strip_declaration(text: &str) -> &str {
    let Some(after) = text.strip_prefix("<?") else {
        return text;
    };
    match after.find("?>") {
        Some(end) => {
            let rest = &after[end + 2..];
            rest.strip_prefix('\n').unwrap_or(rest)
        }
        None => text,
    }
}

/// Sign a message with key material read from disk for this call only.
pub fn sign_message_with_files(
    message: &str,
    certificate: impl AsRef<Path>,
    private_key: impl AsRef<Path>,
    password: &str,
) -> Result<String> {
    let signer = RsaSigner::from_files(private_key, password, certificate)?;
    sign_message(message, &signer)
}
