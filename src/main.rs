use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use ciborium::Value;
use clap::Parser;
use clap_stdin::MaybeStdin;
use greenpass::{
    definitions::{CertificateType, GreenPass},
    revocation::RevocationStore,
    settings::Settings,
    trust::{ReqwestClient, TrustListResolver},
    validation::ValidationStatus,
    verifier::{self, Verifier},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, clap::Subcommand)]
enum Action {
    /// Print the headers and claims of a token without authenticating it.
    Decode {
        /// HC1 token, or `-` to read it from stdin.
        token: MaybeStdin<String>,
    },
    /// Authenticate a token and evaluate it under a scan mode.
    Verify {
        /// HC1 token, or `-` to read it from stdin.
        token: MaybeStdin<String>,
        /// One of 3G, 2G, BOOSTED, SCHOOL, WORK, ENTRY_IT.
        #[arg(long, default_value = "3G")]
        mode: String,
        /// Certificate identifiers to treat as revoked.
        #[arg(long)]
        revoked: Vec<String>,
    },
    /// Download the trust list regardless of its age.
    Refresh,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = load_settings(args.config.as_deref())?;
    match args.action {
        Action::Decode { token } => decode(&settings, token.to_string().trim()),
        Action::Verify {
            token,
            mode,
            revoked,
        } => verify(&settings, token.to_string().trim(), &mode, revoked).await,
        Action::Refresh => refresh(&settings).await,
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, Error> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("could not read settings from {}", path.display()))?;
    Settings::from_json(&json).context("could not parse settings")
}

fn resolver(settings: &Settings) -> Result<TrustListResolver<ReqwestClient>, Error> {
    let client = ReqwestClient::with_timeout(settings.trust.request_timeout())?;
    Ok(TrustListResolver::open(client, &settings.trust))
}

fn decode(settings: &Settings, token: &str) -> Result<(), Error> {
    let structure = greenpass::decoder::decode(token, &settings.decoder)
        .context("could not decode token")?;
    let claims = serde_json::to_value(Value::Map(structure.claims().to_vec()))
        .context("could not convert claims to JSON")?;
    let output = serde_json::json!({
        "algorithm": structure
            .algorithm(settings.header_policy)
            .map(|alg| format!("{alg:?}")),
        "key_id": structure.key_id(settings.header_policy).map(base64::encode),
        "claims": claims,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn verify(
    settings: &Settings,
    token: &str,
    mode: &str,
    revoked: Vec<String>,
) -> Result<(), Error> {
    let verifier = Verifier::new(resolver(settings)?, settings).context("invalid rule settings")?;
    let pass = verifier
        .authenticate(token)
        .await
        .context("could not authenticate token")?;

    let revocations = RevocationStore::new();
    revocations.insert_all(revoked);
    let status = verifier.evaluate_code(&pass, mode, verifier::now(), &revocations);

    println!("{}", serde_json::to_string_pretty(&summary(&pass, mode, status))?);
    Ok(())
}

fn summary(pass: &GreenPass, mode: &str, status: ValidationStatus) -> serde_json::Value {
    let names = &pass.holder.names;
    let kind = match &pass.certificate {
        CertificateType::Vaccination(_) => "vaccination",
        CertificateType::Test(_) => "test",
        CertificateType::Recovery(_) => "recovery",
    };
    serde_json::json!({
        "status": status,
        "mode": mode,
        "type": kind,
        "issuer": pass.issuer,
        "family_name": names.family_name.as_ref().or(names.family_name_transliterated.as_ref()),
        "given_name": names.given_name.as_ref().or(names.given_name_transliterated.as_ref()),
        "date_of_birth": pass.holder.date_of_birth.map(|dob| dob.to_string()),
        "vaccination": pass.vaccination(),
    })
}

async fn refresh(settings: &Settings) -> Result<(), Error> {
    let resolver = resolver(settings)?;
    resolver
        .refresh()
        .await
        .context("could not refresh the trust list")?;
    let (authorized, certificates) = resolver.counts();
    let output = serde_json::json!({
        "authorized_key_ids": authorized,
        "certificates": certificates,
        "cache": resolver.cache().certificates_path(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
