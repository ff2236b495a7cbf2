/// Produces raw signatures over canonical `SignedInfo` bytes.
///
/// Signing is synchronous; a signature over one `SignedInfo` block is short
/// CPU work and is done inline by the async client.
pub trait MessageSigner: Send + Sync {
    /// Sign canonical bytes. Returns raw signature bytes.
    fn sign(&self, data: &[u8]) -> crate::Result<Vec<u8>>;

    /// The identifier placed in `KeyInfo/KeyName`.
    fn key_name(&self) -> &str;

    /// The URI placed in `SignedInfo/SignatureMethod`.
    fn algorithm(&self) -> &str;
}
