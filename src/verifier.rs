//! The whole verification pipeline: decode, resolve the signer, check the
//! signature, project the payload and apply the admission rules.
//!
//! Each stage runs only on the output of a stage that succeeded. Errors name
//! the stage that failed so callers can tell a bad certificate
//! ([`Error::Decode`], [`Error::Signature`], ...) from a trust list that could
//! not be refreshed ([`TrustError::RefreshFailed`]).

use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

use crate::{
    cose::{sign1::SignedStructure, SignatureError, SignatureVerifier},
    decoder::{self, DecodeError, DecodeOptions},
    definitions::{CertificateType, GreenPass, ProjectionError},
    revocation::RevocationList,
    settings::Settings,
    trust::{TrustAnchorSource, TrustError},
    validation::{RuleError, ScanMode, ValidationStatus, VaccineChecker},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Trust(#[from] TrustError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// The current instant in UTC, as the rule engine takes it.
pub fn now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub struct Verifier<T> {
    trust: T,
    signatures: SignatureVerifier,
    decode_options: DecodeOptions,
    checker: VaccineChecker,
}

impl<T: TrustAnchorSource> Verifier<T> {
    pub fn new(trust: T, settings: &Settings) -> Result<Self, RuleError> {
        Ok(Self {
            trust,
            signatures: SignatureVerifier::new(settings.header_policy),
            decode_options: settings.decoder.clone(),
            checker: VaccineChecker::new(settings.validation_rules()?, Default::default()),
        })
    }

    pub fn with_checker(mut self, checker: VaccineChecker) -> Self {
        self.checker = checker;
        self
    }

    pub fn trust(&self) -> &T {
        &self.trust
    }

    /// Decode a token without authenticating it.
    pub fn decode(&self, token: &str) -> Result<SignedStructure, DecodeError> {
        decoder::decode(token, &self.decode_options)
    }

    /// Decode and authenticate a token. The payload is only projected once
    /// the signature has been verified.
    pub async fn authenticate(&self, token: &str) -> Result<GreenPass, Error> {
        let structure = self.decode(token)?;
        let key_id = structure
            .key_id(self.signatures.policy())
            .ok_or(TrustError::MissingKeyId)?;
        let anchor = self.trust.resolve(key_id).await?;
        self.signatures.verify(&structure, &anchor)?;
        debug!("signature verified with key id {}", base64::encode(key_id));
        Ok(GreenPass::from_claims(structure.claims())?)
    }

    pub fn evaluate(
        &self,
        pass: &GreenPass,
        mode: ScanMode,
        at: PrimitiveDateTime,
        revoked: &dyn RevocationList,
    ) -> ValidationStatus {
        match &pass.certificate {
            CertificateType::Vaccination(dose) => {
                self.checker.check(dose, &pass.holder, mode, at, revoked)
            }
            CertificateType::Test(_) | CertificateType::Recovery(_) => ValidationStatus::NotEuDcc,
        }
    }

    /// Like [`evaluate`](Self::evaluate) with the mode given by its code, as
    /// scanners send it.
    pub fn evaluate_code(
        &self,
        pass: &GreenPass,
        mode: &str,
        at: PrimitiveDateTime,
        revoked: &dyn RevocationList,
    ) -> ValidationStatus {
        match &pass.certificate {
            CertificateType::Vaccination(dose) => {
                self.checker.check_code(dose, &pass.holder, mode, at, revoked)
            }
            CertificateType::Test(_) | CertificateType::Recovery(_) => ValidationStatus::NotEuDcc,
        }
    }

    /// Authenticate a token and evaluate it under `mode` at `at`.
    pub async fn verify(
        &self,
        token: &str,
        mode: ScanMode,
        at: PrimitiveDateTime,
        revoked: &dyn RevocationList,
    ) -> Result<ValidationStatus, Error> {
        let pass = self.authenticate(token).await?;
        Ok(self.evaluate(&pass, mode, at, revoked))
    }
}
