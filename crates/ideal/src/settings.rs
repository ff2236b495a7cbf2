use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IdealError, Result};

/// Banks with a known iDEAL endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Acquirer {
    Ing,
    Rabobank,
}

impl Acquirer {
    pub fn url(&self, test: bool) -> &'static str {
        match (self, test) {
            (Self::Ing, false) => "https://ideal.secure-ing.com:443/ideal/iDEALv3",
            (Self::Ing, true) => "https://idealtest.secure-ing.com:443/ideal/iDEALv3",
            (Self::Rabobank, false) => "https://ideal.rabobank.nl/ideal/iDealv3",
            (Self::Rabobank, true) => "https://idealtest.rabobank.nl/ideal/iDEALv3",
        }
    }
}

/// Merchant configuration for an [`IdealClient`](crate::IdealClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub private_key_file: PathBuf,
    #[serde(skip_serializing)]
    pub private_key_password: String,
    pub private_certificate: PathBuf,
    /// Acquirer certificates trusted for responses, tried in order.
    pub certificates: Vec<PathBuf>,
    pub merchant_id: String,
    pub sub_id: String,
    pub merchant_return_url: String,
    /// ISO 8601 duration; a bare number of minutes is accepted too.
    pub expiration_period: String,
    /// ISO 639-1, `nl` or `en`.
    pub language: String,
    pub acquirer: Option<Acquirer>,
    /// Overrides the acquirer's endpoint.
    pub acquirer_url: Option<String>,
    pub test_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            private_key_file: PathBuf::from("priv.pem"),
            private_key_password: String::new(),
            private_certificate: PathBuf::from("cert.cer"),
            certificates: vec![PathBuf::from("ideal_v3.cer")],
            merchant_id: String::new(),
            sub_id: "0".into(),
            merchant_return_url: String::new(),
            expiration_period: "PT15M".into(),
            language: "nl".into(),
            acquirer: None,
            acquirer_url: None,
            test_mode: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("private_key_password", self.private_key_password.as_str()),
            ("merchant_id", self.merchant_id.as_str()),
            ("sub_id", self.sub_id.as_str()),
            ("merchant_return_url", self.merchant_return_url.as_str()),
            ("expiration_period", self.expiration_period.as_str()),
            ("language", self.language.as_str()),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(IdealError::Configuration(format!("the {name} setting cannot be empty")));
        }

        if self.acquirer.is_none() && self.acquirer_url.as_deref().is_none_or(str::is_empty) {
            return Err(IdealError::Configuration(
                "either acquirer or acquirer_url needs to be set".into(),
            ));
        }

        require_file("private_key_file", &self.private_key_file)?;
        require_file("private_certificate", &self.private_certificate)?;

        if self.certificates.is_empty() {
            return Err(IdealError::Configuration(
                "at least one trusted certificate is required".into(),
            ));
        }
        for cert in &self.certificates {
            require_file("certificates", cert)?;
        }
        Ok(())
    }

    /// The endpoint requests are posted to.
    pub fn acquirer_url(&self) -> Result<String> {
        if let Some(url) = self.acquirer_url.as_deref().filter(|url| !url.is_empty()) {
            return Ok(url.to_owned());
        }
        self.acquirer
            .map(|acquirer| acquirer.url(self.test_mode).to_owned())
            .ok_or_else(|| IdealError::Configuration("could not determine the acquirer URL".into()))
    }

    pub fn expiration_period(&self) -> String {
        normalize_expiration_period(&self.expiration_period)
    }
}

/// Turn a bare number of minutes into an ISO 8601 duration (`5` becomes `PT5M`).
pub fn normalize_expiration_period(period: &str) -> String {
    match period.parse::<u32>() {
        Ok(minutes) if minutes.to_string() == period => format!("PT{minutes}M"),
        _ => period.to_owned(),
    }
}

fn require_file(name: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || !path.exists() {
        return Err(IdealError::Configuration(format!(
            "the {name} file ({}) could not be found",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    fn valid() -> Settings {
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

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.sub_id, "0");
        assert_eq!(settings.expiration_period, "PT15M");
        assert_eq!(settings.language, "nl");
        assert!(settings.test_mode);
    }

    #[test]
    fn valid_settings_pass() {
        valid().validate().unwrap();
    }

    #[test]
    fn empty_merchant_id_is_rejected() {
        let settings = Settings { merchant_id: String::new(), ..valid() };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("merchant_id"));
    }

    #[test]
    fn acquirer_or_url_required() {
        let settings = Settings { acquirer: None, ..valid() };
        assert!(matches!(settings.validate(), Err(IdealError::Configuration(_))));

        let settings = Settings {
            acquirer: None,
            acquirer_url: Some("https://acquirer.test/ideal".into()),
            ..valid()
        };
        settings.validate().unwrap();
    }

    #[test]
    fn missing_files_are_rejected() {
        let settings = Settings { private_key_file: fixture("missing.pem"), ..valid() };
        assert!(matches!(settings.validate(), Err(IdealError::Configuration(_))));

        let settings = Settings {
            certificates: vec![fixture("cert.cer"), fixture("missing.cer")],
            ..valid()
        };
        assert!(matches!(settings.validate(), Err(IdealError::Configuration(_))));

        let settings = Settings { certificates: vec![], ..valid() };
        assert!(matches!(settings.validate(), Err(IdealError::Configuration(_))));
    }

    #[test]
    fn acquirer_urls() {
        let mut settings = valid();
        assert_eq!(
            settings.acquirer_url().unwrap(),
            "https://idealtest.secure-ing.com:443/ideal/iDEALv3"
        );
        settings.test_mode = false;
        assert_eq!(
            settings.acquirer_url().unwrap(),
            "https://ideal.secure-ing.com:443/ideal/iDEALv3"
        );
        settings.acquirer = Some(Acquirer::Rabobank);
        assert_eq!(settings.acquirer_url().unwrap(), "https://ideal.rabobank.nl/ideal/iDealv3");
        settings.acquirer_url = Some("https://acquirer.test/ideal".into());
        assert_eq!(settings.acquirer_url().unwrap(), "https://acquirer.test/ideal");
    }

    #[test]
    fn no_acquirer_has_no_url() {
        let settings = Settings::default();
        assert!(matches!(settings.acquirer_url(), Err(IdealError::Configuration(_))));
    }

    #[test]
    fn expiration_period_in_minutes() {
        assert_eq!(normalize_expiration_period("5"), "PT5M");
        assert_eq!(normalize_expiration_period("PT1H"), "PT1H");
        assert_eq!(normalize_expiration_period("05"), "05");
        let settings = Settings { expiration_period: "30".into(), ..valid() };
        assert_eq!(settings.expiration_period(), "PT30M");
    }

    #[test]
    fn password_is_not_serialized() {
        let settings = Settings { private_key_password: "hunter2-secret".into(), ..valid() };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("hunter2-secret"));
    }
}
