//! Fixed XML fragments of the signature profile.
//!
//! Whitespace and quoting here end up byte for byte in every signed message.

use super::algorithm::{ENVELOPED_SIGNATURE, EXC_C14N, SHA256, XMLDSIG_NS};

pub fn signed_info(digest_value: &str, signature_method: &str) -> String {
    format!(
        "<SignedInfo xmlns='{XMLDSIG_NS}'>
  <CanonicalizationMethod Algorithm='{EXC_C14N}'/>
  <SignatureMethod Algorithm='{signature_method}'/>
  <Reference URI=''>
   <Transforms>
    <Transform Algorithm='{ENVELOPED_SIGNATURE}'/>
   </Transforms>
   <DigestMethod Algorithm='{SHA256}'/>
   <DigestValue>{digest_value}</DigestValue>
  </Reference>
 </SignedInfo>"
    )
}

pub fn signature(signed_info: &str, signature_value: &str, key_name: &str) -> String {
    format!(
        "<Signature xmlns='{XMLDSIG_NS}'>
{signed_info}
 <SignatureValue>{signature_value}</SignatureValue>
 <KeyInfo>
   <KeyName>{key_name}</KeyName>
  </KeyInfo>
</Signature>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_info_embeds_digest() {
        let block = signed_info("abc=", "urn:method");
        assert!(block.starts_with("<SignedInfo xmlns='http://www.w3.org/2000/09/xmldsig#'>\n"));
        assert!(block.contains("<DigestValue>abc=</DigestValue>"));
        assert!(block.contains("<SignatureMethod Algorithm='urn:method'/>"));
        assert!(block.ends_with("</SignedInfo>"));
    }

    #[test]
    fn signature_layout() {
        let block = signature("<SignedInfo/>", "c2ln", "deadbeef");
        assert_eq!(
            block,
            "<Signature xmlns='http://www.w3.org/2000/09/xmldsig#'>\n<SignedInfo/>\n <SignatureValue>c2ln</SignatureValue>\n <KeyInfo>\n   <KeyName>deadbeef</KeyName>\n  </KeyInfo>\n</Signature>"
        );
    }
}
