use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ideal::client::TransactionOptions;
use ideal::messages::Amount;
use ideal::security::{self, Certificate, DigestMethod, RsaSigner, Verifier};
use ideal::{Acquirer, IdealClient, Settings};

#[derive(Parser)]
#[clap(name = "ideal", version, about = "Sign, verify and send iDEAL messages")]
struct Args {
    #[clap(flatten)]
    settings: SettingsArgs,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct SettingsArgs {
    #[clap(long, env = "IDEAL_PRIVATE_KEY_FILE", default_value = "priv.pem", global = true)]
    private_key_file: PathBuf,
    #[clap(long, env = "IDEAL_PRIVATE_KEY_PASSWORD", default_value = "", hide_env_values = true, global = true)]
    private_key_password: String,
    #[clap(long, env = "IDEAL_PRIVATE_CERTIFICATE", default_value = "cert.cer", global = true)]
    private_certificate: PathBuf,
    /// Trusted acquirer certificate; repeat or comma-separate for several.
    #[clap(long = "certificate", env = "IDEAL_CERTIFICATES", value_delimiter = ',', global = true)]
    certificates: Vec<PathBuf>,
    #[clap(long, env = "IDEAL_MERCHANT_ID", default_value = "", global = true)]
    merchant_id: String,
    #[clap(long, env = "IDEAL_SUB_ID", default_value = "0", global = true)]
    sub_id: String,
    #[clap(long, env = "IDEAL_MERCHANT_RETURN_URL", default_value = "", global = true)]
    merchant_return_url: String,
    #[clap(long, env = "IDEAL_EXPIRATION_PERIOD", default_value = "PT15M", global = true)]
    expiration_period: String,
    #[clap(long, env = "IDEAL_LANGUAGE", default_value = "nl", global = true)]
    language: String,
    #[clap(long, env = "IDEAL_ACQUIRER", global = true)]
    acquirer: Option<Acquirer>,
    #[clap(long, env = "IDEAL_ACQUIRER_URL", global = true)]
    acquirer_url: Option<String>,
    /// Use the acquirer's production endpoint instead of the test one.
    #[clap(long, env = "IDEAL_PRODUCTION", global = true)]
    production: bool,
}

impl From<SettingsArgs> for Settings {
    fn from(args: SettingsArgs) -> Self {
        Settings {
            private_key_file: args.private_key_file,
            private_key_password: args.private_key_password,
            private_certificate: args.private_certificate,
            certificates: args.certificates,
            merchant_id: args.merchant_id,
            sub_id: args.sub_id,
            merchant_return_url: args.merchant_return_url,
            expiration_period: args.expiration_period,
            language: args.language,
            acquirer: args.acquirer,
            acquirer_url: args.acquirer_url,
            test_mode: !args.production,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the KeyName (SHA-1 fingerprint) of a certificate.
    Fingerprint { certificate: PathBuf },
    /// Print the base64 digest of a message.
    Digest {
        file: PathBuf,
        #[clap(long, default_value = "sha256")]
        algorithm: String,
    },
    /// Sign a message with the configured key and certificate.
    Sign { file: PathBuf },
    /// Check a signed message against trusted certificates.
    Verify {
        file: PathBuf,
        /// Defaults to the configured trusted certificates.
        #[clap(long = "cert")]
        certs: Vec<PathBuf>,
    },
    /// List the issuers offered by the acquirer.
    Issuers {
        /// Print one flat list instead of grouping by country.
        #[clap(long)]
        flat: bool,
    },
    /// Start a transaction.
    Transaction {
        #[clap(long)]
        issuer: String,
        #[clap(long)]
        purchase_id: String,
        /// In euros, e.g. `12.50`.
        #[clap(long)]
        amount: Amount,
        #[clap(long)]
        description: String,
        #[clap(long)]
        entrance_code: Option<String>,
        #[clap(long)]
        return_url: Option<String>,
        #[clap(long)]
        expires: Option<String>,
        #[clap(long)]
        consumer_language: Option<String>,
    },
    /// Fetch the status of a transaction.
    Status { transaction_id: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::from(args.settings);

    match args.command {
        Command::Fingerprint { certificate } => {
            let cert = Certificate::from_file(&certificate)
                .with_context(|| format!("loading certificate {}", certificate.display()))?;
            println!("{}", cert.fingerprint());
        }
        Command::Digest { file, algorithm } => {
            let method = DigestMethod::from_uri(&algorithm)?;
            println!("{}", security::digest(&read_message(&file)?, method));
        }
        Command::Sign { file } => {
            let signer = RsaSigner::from_files(
                &settings.private_key_file,
                &settings.private_key_password,
                &settings.private_certificate,
            )
            .context("loading signing key")?;
            let signed = security::sign_message(&read_message(&file)?, &signer)?;
            println!("{signed}");
        }
        Command::Verify { file, certs } => {
            let certs = if certs.is_empty() { settings.certificates } else { certs };
            anyhow::ensure!(!certs.is_empty(), "no trusted certificates given");
            let verifier = Verifier::from_files(&certs).context("loading trusted certificates")?;
            let document = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            if !verifier.verify(&document)? {
                eprintln!("not verified");
                return Ok(ExitCode::FAILURE);
            }
            println!("verified");
        }
        Command::Issuers { flat } => {
            let client = IdealClient::new(settings).context("creating iDEAL client")?;
            let issuers = client.get_issuers().await?;
            if flat {
                print_json(&issuers.issuer_list())?;
            } else {
                print_json(&issuers)?;
            }
        }
        Command::Transaction {
            issuer,
            purchase_id,
            amount,
            description,
            entrance_code,
            return_url,
            expires,
            consumer_language,
        } => {
            let client = IdealClient::new(settings).context("creating iDEAL client")?;
            let options = TransactionOptions {
                entrance_code,
                merchant_return_url: return_url,
                expiration_period: expires,
                language: consumer_language,
            };
            let transaction = client
                .start_transaction(&issuer, &purchase_id, amount, &description, options)
                .await?;
            print_json(&transaction)?;
        }
        Command::Status { transaction_id } => {
            let client = IdealClient::new(settings).context("creating iDEAL client")?;
            print_json(&client.get_transaction_status(&transaction_id).await?)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Read an unsigned message; a trailing newline from the editor is not part of it.
fn read_message(path: &Path) -> Result<String> {
    let message = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(message.trim_end().to_owned())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing output")?);
    Ok(())
}
