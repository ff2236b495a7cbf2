use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{TimeZone, Utc};

use ideal::client::{CONTENT_TYPE, TransactionOptions};
use ideal::messages::Amount;
use ideal::security::{self, RsaSigner};
use ideal::{
    Acquirer, HttpRequest, HttpResponse, IdealClient, IdealError, Result, Settings,
    TransactionStatus, Transport,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn settings() -> Settings {
    Settings {
        private_key_file: fixture("priv.pem"),
        private_key_password: "example".into(),
        private_certificate: fixture("cert.cer"),
        certificates: vec![fixture("cert.cer")],
        merchant_id: "001234567".into(),
        merchant_return_url: "http://www.example.com/ideal/callback/".into(),
        acquirer: Some(Acquirer::Ing),
        ..Settings::default()
    }
}

enum Reply {
    /// A canned response, signed with the test key.
    Signed,
    /// A canned response, sent without a signature.
    Unsigned,
    /// A canned response whose body is altered after signing.
    Tampered,
    Status(u16, &'static str),
}

/// Answers every request with the canned response matching its message type.
struct MockTransport {
    signer: RsaSigner,
    reply: Reply,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    fn new(reply: Reply) -> Self {
        Self {
            signer: RsaSigner::from_files(fixture("priv.pem"), "example", fixture("cert.cer")).unwrap(),
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn canned_response(body: &str) -> String {
        let name = [
            ("<DirectoryReq", "directory.xml"),
            ("<AcquirerTrxReq", "transaction.xml"),
            ("<AcquirerStatusReq", "status.xml"),
        ]
        .iter()
        .find(|(tag, _)| body.contains(tag))
        .map(|(_, name)| *name)
        .unwrap_or("error.xml");
        std::fs::read_to_string(fixture("responses").join(name)).unwrap()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let unsigned = Self::canned_response(&request.body);

        let body = match self.reply {
            Reply::Status(status, body) => {
                return Ok(HttpResponse {
                    status,
                    headers: vec![],
                    body: body.as_bytes().to_vec(),
                });
            }
            Reply::Unsigned => unsigned,
            Reply::Signed => security::sign_message(&unsigned, &self.signer)?,
            Reply::Tampered => security::sign_message(&unsigned, &self.signer)?.replacen("0050", "0051", 1),
        };

        Ok(HttpResponse {
            status: 200,
            headers: vec![("Server".into(), "Mock iDEAL server".into())],
            body: format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}").into_bytes(),
        })
    }
}

fn client(reply: Reply) -> IdealClient<MockTransport> {
    IdealClient::with_transport(settings(), MockTransport::new(reply)).unwrap()
}

#[test]
fn invalid_settings_are_rejected() {
    let settings = Settings { merchant_id: String::new(), ..settings() };
    let result = IdealClient::with_transport(settings, MockTransport::new(Reply::Signed));
    assert!(matches!(result, Err(IdealError::Configuration(_))));
}

#[test]
fn wrong_password_is_rejected_up_front() {
    let settings = Settings { private_key_password: "wrong".into(), ..settings() };
    let result = IdealClient::with_transport(settings, MockTransport::new(Reply::Signed));
    assert!(matches!(result, Err(IdealError::KeyUnlock(_))));
}

#[test]
fn requests_are_signed_and_addressed() {
    let client = client(Reply::Signed);
    let request = client.create_request("<DirectoryReq><a>1</a></DirectoryReq>").unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.uri, "https://idealtest.secure-ing.com:443/ideal/iDEALv3");
    assert_eq!(request.headers, vec![("Content-Type".to_string(), CONTENT_TYPE.to_string())]);
    assert!(request.body.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?><DirectoryReq><a>1</a><Signature"));
    assert!(request.body.ends_with("</Signature></DirectoryReq>"));
    assert!(security::verify(&request.body, &[security::Certificate::from_file(fixture("cert.cer")).unwrap()]).unwrap());
}

#[test]
fn existing_declaration_is_kept() {
    let client = client(Reply::Signed);
    let request = client
        .create_request("<?xml version=\"1.0\"?>\n<DirectoryReq></DirectoryReq>")
        .unwrap();
    assert!(request.body.starts_with("<?xml version=\"1.0\"?>\n<DirectoryReq>"));
    assert!(security::verify(&request.body, &[security::Certificate::from_file(fixture("cert.cer")).unwrap()]).unwrap());
}

#[tokio::test]
async fn get_issuers() {
    let client = client(Reply::Signed);
    let response = client.get_issuers().await.unwrap();

    assert_eq!(response.acquirer_id, "0050");
    assert_eq!(response.issuers.len(), 1);
    let nederland = &response.issuers["Nederland"];
    assert_eq!(nederland["INGBNL2A"], "Issuer Simulation V3 - ING");
    assert_eq!(nederland["RABONL2U"], "Issuer Simulation V3 - RABO");

    let flat = response.issuer_list();
    assert_eq!(flat.len(), 2);
    assert_eq!(flat["RABONL2U"], "Issuer Simulation V3 - RABO");

    let sent = client.transport().last_request();
    assert!(sent.body.contains("<merchantID>001234567</merchantID>"));
    assert!(sent.body.contains("<subID>0</subID>"));
}

#[tokio::test]
async fn start_transaction() {
    let client = client(Reply::Signed);
    let response = client
        .start_transaction(
            "INGBNL2A",
            "test",
            "1.0".parse().unwrap(),
            "test transaction",
            TransactionOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(response.transaction_id, "0050000034620811");
    assert!(response.issuer_authentication_url.contains(&response.transaction_id));
    assert!(response.issuer_authentication_url.ends_with("&ideal=prob"));
    assert_eq!(response.entrance_code.len(), 40);

    let sent = client.transport().last_request().body;
    assert!(sent.contains("<issuerID>INGBNL2A</issuerID>"));
    assert!(sent.contains("<amount>1.00</amount>"));
    assert!(sent.contains("<expirationPeriod>PT15M</expirationPeriod>"));
    assert!(sent.contains("<language>nl</language>"));
    assert!(sent.contains(&format!("<entranceCode>{}</entranceCode>", response.entrance_code)));
}

#[tokio::test]
async fn start_transaction_with_overrides() {
    let client = client(Reply::Signed);
    let options = TransactionOptions {
        entrance_code: Some("resume0123".into()),
        merchant_return_url: Some("https://shop.example/return".into()),
        expiration_period: Some("5".into()),
        language: Some("en".into()),
    };
    let response = client
        .start_transaction("RABONL2U", "order-1", Amount::from_cents(2500), "order", options)
        .await
        .unwrap();
    assert_eq!(response.entrance_code, "resume0123");

    let sent = client.transport().last_request().body;
    assert!(sent.contains("<merchantReturnURL>https://shop.example/return</merchantReturnURL>"));
    assert!(sent.contains("<expirationPeriod>PT5M</expirationPeriod>"));
    assert!(sent.contains("<language>en</language>"));
    assert!(sent.contains("<amount>25.00</amount>"));
}

#[tokio::test]
async fn get_transaction_status() {
    let client = client(Reply::Signed);
    let response = client.get_transaction_status("0123456789").await.unwrap();

    assert_eq!(response.transaction_id, "0123456789");
    assert_eq!(response.status, TransactionStatus::Success);
    assert!(response.status.is_final());
    assert_eq!(response.amount, Some(Amount::from_cents(10000)));
    assert_eq!(response.currency.as_deref(), Some("EUR"));
    assert_eq!(response.consumer_bic.as_deref(), Some("INGBNL2A"));
    assert_eq!(response.consumer_iban.as_deref(), Some("NL53INGB0654422370"));
    assert_eq!(
        response.consumer_name.as_deref(),
        Some("Hr E G H Küppers en/of Mw M J Küppers an nog een lange consumername")
    );
    let expected = Utc.with_ymd_and_hms(2013, 8, 7, 11, 50, 28).unwrap()
        + chrono::Duration::milliseconds(348);
    assert_eq!(response.status_date_timestamp, Some(expected));
}

#[tokio::test]
async fn error_response() {
    let client = client(Reply::Signed);
    let err = client.request("<oops></oops>").await.unwrap_err();
    match &err {
        IdealError::Response(error) => {
            assert_eq!(error.error_code.as_deref(), Some("IX1100"));
            assert_eq!(
                error.consumer_message.as_deref(),
                Some("Betalen met iDEAL is nu niet mogelijk.")
            );
        }
        other => panic!("expected Response, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "IX1100: Received XML not valid (Field generating error: boo)."
    );
}

#[tokio::test]
async fn unsigned_response_fails_security() {
    let client = client(Reply::Unsigned);
    let err = client.get_issuers().await.unwrap_err();
    assert!(matches!(err, IdealError::Security(_)));
}

#[tokio::test]
async fn tampered_response_fails_security() {
    let client = client(Reply::Tampered);
    let err = client.get_issuers().await.unwrap_err();
    assert!(matches!(err, IdealError::Security(_)));
}

#[tokio::test]
async fn untrusted_response_fails_security() {
    let settings = Settings { certificates: vec![fixture("acquirer.cer")], ..settings() };
    let client = IdealClient::with_transport(settings, MockTransport::new(Reply::Signed)).unwrap();
    let err = client.get_issuers().await.unwrap_err();
    assert!(matches!(err, IdealError::Security(_)));
}

#[tokio::test]
async fn http_error_is_server_error() {
    let client = client(Reply::Status(500, "Internal Server Error"));
    let err = client.get_issuers().await.unwrap_err();
    assert!(matches!(err, IdealError::Server(ref message) if message.contains("HTTP 500")));
    assert!(err.is_acquirer_error());
}

#[tokio::test]
async fn unparsable_response_is_server_error() {
    let client = client(Reply::Status(200, "<DirectoryRes>"));
    let err = client.get_issuers().await.unwrap_err();
    assert!(matches!(err, IdealError::Server(_)));
}

#[test]
fn error_response_is_classified_before_parsing() {
    let client = client(Reply::Signed);
    let body = std::fs::read_to_string(fixture("responses/error.xml")).unwrap();
    let signed = security::sign_message(&body, &client.transport().signer).unwrap();
    let err = client
        .create_response(HttpResponse { status: 200, headers: vec![], body: signed.into_bytes() })
        .unwrap_err();
    assert!(matches!(err, IdealError::Response(_)));
}

#[test]
fn verified_body_is_returned() {
    let client = client(Reply::Signed);
    let body = std::fs::read_to_string(fixture("responses/directory.xml")).unwrap();
    let signed = security::sign_message(&body, &client.transport().signer).unwrap();
    let verified = client
        .create_response(HttpResponse { status: 200, headers: vec![], body: signed.clone().into_bytes() })
        .unwrap();
    assert_eq!(verified, signed);
}
