//! Unsigned iDEAL request messages.
//!
//! The templates are already in exclusive canonical form (double-quoted
//! attributes, explicit end tags, no declaration), so the digest over the raw
//! text matches what the acquirer computes over the canonicalized document.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::{IdealError, Result};
use crate::security::algorithm::IDEAL_NS;
use crate::security::c14n::escape_text;

pub const VERSION: &str = "3.3.1";
pub const CURRENCY: &str = "EUR";

const PURCHASE_ID_MAX: usize = 16;
const DESCRIPTION_MAX: usize = 32;

/// A euro amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Amount {
    type Err = IdealError;

    /// Parse `12`, `12.5` or `12.50`. More than two decimals is rejected.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || IdealError::Parse(format!("invalid amount: {s:?}"));
        let (units, fraction) = s.trim().split_once('.').unwrap_or((s.trim(), ""));
        if units.is_empty() || fraction.len() > 2 {
            return Err(invalid());
        }
        if !units.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let units: u64 = units.parse().map_err(|_| invalid())?;
        let cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<u64>().map_err(|_| invalid())?,
        };
        units
            .checked_mul(100)
            .and_then(|value| value.checked_add(cents))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fields shared by every request.
#[derive(Debug, Clone)]
pub struct Merchant<'a> {
    pub merchant_id: &'a str,
    pub sub_id: &'a str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TransactionRequest<'a> {
    pub issuer_id: &'a str,
    pub merchant_return_url: &'a str,
    pub purchase_id: &'a str,
    pub amount: Amount,
    pub expiration_period: &'a str,
    pub language: &'a str,
    pub description: &'a str,
    pub entrance_code: &'a str,
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// A random 40 character entrance code.
pub fn generate_entrance_code() -> String {
    let bytes: [u8; 20] = rand::random();
    hex::encode(bytes)
}

pub fn directory_request(merchant: &Merchant<'_>) -> String {
    format!(
        r#"<DirectoryReq xmlns="{IDEAL_NS}" version="{VERSION}">
    <createDateTimestamp>{timestamp}</createDateTimestamp>
    <Merchant>
        <merchantID>{merchant_id}</merchantID>
        <subID>{sub_id}</subID>
    </Merchant>
</DirectoryReq>"#,
        timestamp = format_timestamp(merchant.timestamp),
        merchant_id = escape_text(merchant.merchant_id),
        sub_id = escape_text(merchant.sub_id),
    )
}

/// Render an `AcquirerTrxReq`. The purchase id and description are cut to
/// the lengths the acquirer accepts.
pub fn transaction_request(merchant: &Merchant<'_>, transaction: &TransactionRequest<'_>) -> String {
    format!(
        r#"<AcquirerTrxReq xmlns="{IDEAL_NS}" version="{VERSION}">
    <createDateTimestamp>{timestamp}</createDateTimestamp>
    <Issuer>
        <issuerID>{issuer_id}</issuerID>
    </Issuer>
    <Merchant>
        <merchantID>{merchant_id}</merchantID>
        <subID>{sub_id}</subID>
        <merchantReturnURL>{return_url}</merchantReturnURL>
    </Merchant>
    <Transaction>
        <purchaseID>{purchase_id}</purchaseID>
        <amount>{amount}</amount>
        <currency>{CURRENCY}</currency>
        <expirationPeriod>{expiration_period}</expirationPeriod>
        <language>{language}</language>
        <description>{description}</description>
        <entranceCode>{entrance_code}</entranceCode>
    </Transaction>
</AcquirerTrxReq>"#,
        timestamp = format_timestamp(merchant.timestamp),
        issuer_id = escape_text(transaction.issuer_id),
        merchant_id = escape_text(merchant.merchant_id),
        sub_id = escape_text(merchant.sub_id),
        return_url = escape_text(transaction.merchant_return_url),
        purchase_id = escape_text(&truncate(transaction.purchase_id, PURCHASE_ID_MAX)),
        amount = transaction.amount,
        expiration_period = escape_text(transaction.expiration_period),
        language = escape_text(transaction.language),
        description = escape_text(&truncate(transaction.description, DESCRIPTION_MAX)),
        entrance_code = escape_text(transaction.entrance_code),
    )
}

pub fn status_request(merchant: &Merchant<'_>, transaction_id: &str) -> String {
    format!(
        r#"<AcquirerStatusReq xmlns="{IDEAL_NS}" version="{VERSION}">
    <createDateTimestamp>{timestamp}</createDateTimestamp>
    <Merchant>
        <merchantID>{merchant_id}</merchantID>
        <subID>{sub_id}</subID>
    </Merchant>
    <Transaction>
        <transactionID>{transaction_id}</transactionID>
    </Transaction>
</AcquirerStatusReq>"#,
        timestamp = format_timestamp(merchant.timestamp),
        merchant_id = escape_text(merchant.merchant_id),
        sub_id = escape_text(merchant.sub_id),
        transaction_id = escape_text(transaction_id),
    )
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
