//! Parsed acquirer responses.
//!
//! Parsing expects a body that has already passed signature verification.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use serde::Serialize;

use crate::error::{IdealError, Result};
use crate::messages::Amount;
use crate::security::algorithm::IDEAL_NS;

/// Issuers (consumer banks) offered by the acquirer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryResponse {
    pub acquirer_id: String,
    /// Country name to issuer id to issuer name.
    pub issuers: BTreeMap<String, BTreeMap<String, String>>,
}

impl DirectoryResponse {
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();

        let mut issuers: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for issuer in root.descendants().filter(|node| is_ideal(*node, "Issuer")) {
            let issuer_id = required_text(issuer, &["issuerID"])?;
            let issuer_name = required_text(issuer, &["issuerName"])?;
            let country = issuer
                .parent_element()
                .ok_or_else(|| IdealError::MissingElement("Country".into()))
                .and_then(|country| required_text(country, &["countryNames"]))?;
            issuers.entry(country).or_default().insert(issuer_id, issuer_name);
        }

        Ok(Self {
            acquirer_id: required_text(root, &["Acquirer", "acquirerID"])?,
            issuers,
        })
    }

    /// All issuers regardless of country.
    pub fn issuer_list(&self) -> BTreeMap<String, String> {
        self.issuers
            .values()
            .flat_map(|issuers| issuers.iter())
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResponse {
    pub acquirer_id: String,
    /// Where the consumer is redirected to authorize the payment.
    pub issuer_authentication_url: String,
    pub transaction_id: String,
    /// Sent in the request, not part of the response; kept so the caller can
    /// resume the payment.
    pub entrance_code: String,
}

impl TransactionResponse {
    pub fn parse(xml: &str, entrance_code: impl Into<String>) -> Result<Self> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        Ok(Self {
            acquirer_id: required_text(root, &["Acquirer", "acquirerID"])?,
            issuer_authentication_url: required_text(root, &["Issuer", "issuerAuthenticationURL"])?,
            transaction_id: required_text(root, &["Transaction", "transactionID"])?,
            entrance_code: entrance_code.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionStatus {
    /// The payment is guaranteed.
    Success,
    Cancelled,
    Expired,
    Failure,
    /// Not final yet; ask again later.
    Open,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Cancelled => "Cancelled",
            Self::Expired => "Expired",
            Self::Failure => "Failure",
            Self::Open => "Open",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = IdealError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Success" => Ok(Self::Success),
            "Cancelled" => Ok(Self::Cancelled),
            "Expired" => Ok(Self::Expired),
            "Failure" => Ok(Self::Failure),
            "Open" => Ok(Self::Open),
            other => Err(IdealError::Parse(format!("unknown transaction status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub acquirer_id: String,
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub status_date_timestamp: Option<DateTime<Utc>>,
    pub consumer_name: Option<String>,
    pub consumer_iban: Option<String>,
    pub consumer_bic: Option<String>,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
}

impl StatusResponse {
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        let transaction = ideal_child(root, "Transaction")
            .ok_or_else(|| IdealError::MissingElement("Transaction".into()))?;
        let field = |name: &str| ideal_child(transaction, name).map(node_text);

        let status_date_timestamp = field("statusDateTimestamp")
            .map(|value| {
                DateTime::parse_from_rfc3339(&value)
                    .map(|timestamp| timestamp.with_timezone(&Utc))
                    .map_err(|e| IdealError::Parse(format!("invalid statusDateTimestamp {value:?}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            acquirer_id: required_text(root, &["Acquirer", "acquirerID"])?,
            transaction_id: required_text(transaction, &["transactionID"])?,
            status: required_text(transaction, &["status"])?.parse()?,
            status_date_timestamp,
            consumer_name: field("consumerName"),
            consumer_iban: field("consumerIBAN"),
            consumer_bic: field("consumerBIC"),
            amount: field("amount").map(|value| value.parse()).transpose()?,
            currency: field("currency"),
        })
    }
}

/// The `Error` block of an acquirer error response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub error_detail: Option<String>,
    pub suggested_action: Option<String>,
    pub consumer_message: Option<String>,
}

impl ErrorResponse {
    /// The first `Error` element anywhere in `doc`, if any.
    pub fn find(doc: &Document<'_>) -> Option<Self> {
        let error = doc.descendants().find(|node| is_ideal(*node, "Error"))?;
        let field = |name: &str| ideal_child(error, name).map(node_text);
        Some(Self {
            error_code: field("errorCode"),
            error_message: field("errorMessage"),
            error_detail: field("errorDetail"),
            suggested_action: field("suggestedAction"),
            consumer_message: field("consumerMessage"),
        })
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}).",
            self.error_code.as_deref().unwrap_or_default(),
            self.error_message.as_deref().unwrap_or_default(),
            self.error_detail.as_deref().unwrap_or_default(),
        )
    }
}

fn is_ideal(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(IDEAL_NS)
}

fn ideal_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_ideal(*child, name))
}

fn node_text(node: Node<'_, '_>) -> String {
    node.text().unwrap_or_default().trim().to_owned()
}

fn required_text(node: Node<'_, '_>, path: &[&str]) -> Result<String> {
    path.iter()
        .try_fold(node, |current, name| ideal_child(current, name))
        .map(node_text)
        .ok_or_else(|| IdealError::MissingElement(path.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://www.idealdesk.com/ideal/messages/mer-acq/3.3.1";

    #[test]
    fn directory_groups_by_country() {
        let xml = format!(
            r#"<DirectoryRes xmlns="{NS}" version="3.3.1">
  <Acquirer><acquirerID>0050</acquirerID></Acquirer>
  <Directory>
    <Country>
      <countryNames>Nederland</countryNames>
      <Issuer><issuerID>INGBNL2A</issuerID><issuerName>ING</issuerName></Issuer>
    </Country>
    <Country>
      <countryNames>Belgie</countryNames>
      <Issuer><issuerID>BBRUBEBB</issuerID><issuerName>ING Belgie</issuerName></Issuer>
    </Country>
  </Directory>
</DirectoryRes>"#
        );
        let response = DirectoryResponse::parse(&xml).unwrap();
        assert_eq!(response.acquirer_id, "0050");
        assert_eq!(response.issuers.len(), 2);
        assert_eq!(response.issuers["Nederland"]["INGBNL2A"], "ING");
        let flat = response.issuer_list();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["BBRUBEBB"], "ING Belgie");
    }

    #[test]
    fn directory_without_acquirer_is_rejected() {
        let xml = format!(r#"<DirectoryRes xmlns="{NS}"><Directory/></DirectoryRes>"#);
        let err = DirectoryResponse::parse(&xml).unwrap_err();
        assert!(matches!(err, IdealError::MissingElement(path) if path == "Acquirer/acquirerID"));
    }

    #[test]
    fn elements_outside_namespace_are_ignored() {
        let xml = r#"<DirectoryRes><Acquirer><acquirerID>0050</acquirerID></Acquirer></DirectoryRes>"#;
        assert!(DirectoryResponse::parse(xml).is_err());
    }

    #[test]
    fn status_with_optional_fields_missing() {
        let xml = format!(
            r#"<AcquirerStatusRes xmlns="{NS}">
  <Acquirer><acquirerID>0050</acquirerID></Acquirer>
  <Transaction><transactionID>1</transactionID><status>Open</status></Transaction>
</AcquirerStatusRes>"#
        );
        let response = StatusResponse::parse(&xml).unwrap();
        assert_eq!(response.status, TransactionStatus::Open);
        assert!(!response.status.is_final());
        assert_eq!(response.amount, None);
        assert_eq!(response.consumer_name, None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let xml = format!(
            r#"<AcquirerStatusRes xmlns="{NS}">
  <Acquirer><acquirerID>0050</acquirerID></Acquirer>
  <Transaction><transactionID>1</transactionID><status>Pending</status></Transaction>
</AcquirerStatusRes>"#
        );
        assert!(matches!(StatusResponse::parse(&xml), Err(IdealError::Parse(_))));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            TransactionStatus::Success,
            TransactionStatus::Cancelled,
            TransactionStatus::Expired,
            TransactionStatus::Failure,
            TransactionStatus::Open,
        ] {
            assert_eq!(status.to_string().parse::<TransactionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn error_block_is_found() {
        let xml = format!(
            r#"<AcquirerErrorRes xmlns="{NS}">
  <Error>
    <errorCode>SO1000</errorCode>
    <errorMessage>Failure in system</errorMessage>
    <errorDetail>System generating error: issuer</errorDetail>
  </Error>
</AcquirerErrorRes>"#
        );
        let doc = Document::parse(&xml).unwrap();
        let error = ErrorResponse::find(&doc).unwrap();
        assert_eq!(error.error_code.as_deref(), Some("SO1000"));
        assert_eq!(error.consumer_message, None);
        assert_eq!(error.to_string(), "SO1000: Failure in system (System generating error: issuer).");
    }

    #[test]
    fn no_error_block() {
        let xml = format!(r#"<DirectoryRes xmlns="{NS}"><Error xmlns=""/></DirectoryRes>"#);
        let doc = Document::parse(&xml).unwrap();
        assert_eq!(ErrorResponse::find(&doc), None);
    }
}
