use std::future::Future;

use chrono::Utc;
use roxmltree::Document;
use tracing::{debug, info};

use crate::error::{IdealError, Result};
use crate::messages::{self, Amount, Merchant, TransactionRequest};
use crate::response::{DirectoryResponse, ErrorResponse, StatusResponse, TransactionResponse};
use crate::security::{self, RsaSigner, Verifier};
use crate::settings::{Settings, normalize_expiration_period};
use crate::transport::HttpTransport;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
pub const CONTENT_TYPE: &str = r#"text/xml; charset="utf-8""#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub uri: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Delivers a signed request to the acquirer.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Optional overrides for [`IdealClient::start_transaction`].
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    /// Generated when absent.
    pub entrance_code: Option<String>,
    pub merchant_return_url: Option<String>,
    pub expiration_period: Option<String>,
    pub language: Option<String>,
}

/// iDEAL client. Every request is signed and every response verified.
pub struct IdealClient<T = HttpTransport> {
    settings: Settings,
    signer: RsaSigner,
    verifier: Verifier,
    transport: T,
}

impl IdealClient<HttpTransport> {
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_transport(settings, HttpTransport::new()?)
    }
}

impl<T: Transport> IdealClient<T> {
    /// Validate `settings` and load the key material once.
    pub fn with_transport(settings: Settings, transport: T) -> Result<Self> {
        settings.validate()?;
        let signer = RsaSigner::from_files(
            &settings.private_key_file,
            &settings.private_key_password,
            &settings.private_certificate,
        )?;
        let verifier = Verifier::from_files(&settings.certificates)?;
        Ok(Self { settings, signer, verifier, transport })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sign `body` and address it to the acquirer.
    pub fn create_request(&self, body: &str) -> Result<HttpRequest> {
        let mut signed = security::sign_message(body, &self.signer)?;
        if !signed.starts_with("<?") {
            signed.insert_str(0, XML_DECLARATION);
        }
        Ok(HttpRequest {
            uri: self.settings.acquirer_url()?,
            method: "POST".into(),
            headers: vec![("Content-Type".into(), CONTENT_TYPE.into())],
            body: signed,
        })
    }

    /// Check an acquirer response and return its body once it is trusted.
    pub fn create_response(&self, response: HttpResponse) -> Result<String> {
        if response.status != 200 {
            return Err(IdealError::Server(format!(
                "iDEAL server returned HTTP {}: {}",
                response.status,
                String::from_utf8_lossy(&response.body)
            )));
        }

        let body = String::from_utf8(response.body)
            .map_err(|e| IdealError::Server(format!("iDEAL response could not be parsed: {e}")))?;
        let doc = Document::parse(&body)
            .map_err(|e| IdealError::Server(format!("iDEAL response could not be parsed: {e}")))?;

        let verified = self
            .verifier
            .verify(&body)
            .map_err(|e| IdealError::Security(format!("iDEAL response could not be verified: {e}")))?;
        if !verified {
            return Err(IdealError::Security("iDEAL response could not be verified".into()));
        }

        if let Some(error) = ErrorResponse::find(&doc) {
            return Err(IdealError::Response(error));
        }
        drop(doc);
        Ok(body)
    }

    /// Sign, send and verify one round trip.
    pub async fn request(&self, body: &str) -> Result<String> {
        debug!(%body, "creating request");
        let request = self.create_request(body)?;
        debug!(method = %request.method, uri = %request.uri, body = %request.body, "performing request");

        let response = self.transport.send(&request).await?;
        debug!(
            status = response.status,
            body = %String::from_utf8_lossy(&response.body),
            "received response"
        );
        let status = response.status;

        let verified = self.create_response(response)?;
        info!(method = %request.method, uri = %request.uri, status, "iDEAL request");
        Ok(verified)
    }

    /// Fetch the issuer directory. The list rarely changes; cache it.
    pub async fn get_issuers(&self) -> Result<DirectoryResponse> {
        let body = messages::directory_request(&self.merchant());
        DirectoryResponse::parse(&self.request(&body).await?)
    }

    /// Start a payment. Redirect the consumer to the returned
    /// `issuer_authentication_url`.
    pub async fn start_transaction(
        &self,
        issuer_id: &str,
        purchase_id: &str,
        amount: Amount,
        description: &str,
        options: TransactionOptions,
    ) -> Result<TransactionResponse> {
        let entrance_code = options.entrance_code.unwrap_or_else(messages::generate_entrance_code);
        let expiration_period = options
            .expiration_period
            .map(|period| normalize_expiration_period(&period))
            .unwrap_or_else(|| self.settings.expiration_period());
        let transaction = TransactionRequest {
            issuer_id,
            merchant_return_url: options
                .merchant_return_url
                .as_deref()
                .unwrap_or(&self.settings.merchant_return_url),
            purchase_id,
            amount,
            expiration_period: &expiration_period,
            language: options.language.as_deref().unwrap_or(&self.settings.language),
            description,
            entrance_code: &entrance_code,
        };

        let body = messages::transaction_request(&self.merchant(), &transaction);
        TransactionResponse::parse(&self.request(&body).await?, entrance_code)
    }

    /// Status of a transaction, by the `trxid` the consumer returned with.
    pub async fn get_transaction_status(&self, transaction_id: &str) -> Result<StatusResponse> {
        let body = messages::status_request(&self.merchant(), transaction_id);
        StatusResponse::parse(&self.request(&body).await?)
    }

    fn merchant(&self) -> Merchant<'_> {
        Merchant {
            merchant_id: &self.settings.merchant_id,
            sub_id: &self.settings.sub_id,
            timestamp: Utc::now(),
        }
    }
}
