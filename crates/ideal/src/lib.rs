pub mod client;
pub mod error;
pub mod messages;
pub mod response;
pub mod security;
pub mod settings;
pub mod transport;

pub use client::{HttpRequest, HttpResponse, IdealClient, TransactionOptions, Transport};
pub use error::{IdealError, Result};
pub use messages::Amount;
pub use response::{DirectoryResponse, ErrorResponse, StatusResponse, TransactionResponse, TransactionStatus};
pub use security::{Certificate, MessageSigner, PrivateKey, RsaSigner, Verifier};
pub use settings::{Acquirer, Settings};
pub use transport::HttpTransport;
