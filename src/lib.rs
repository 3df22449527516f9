//! Decoding, authentication and validation of EU Digital COVID Certificates.
//!
//! A scanned `HC1:` token goes through these stages, each only running on data
//! the previous one accepted:
//!
//! 1. [`decoder`]: scheme marker, base45, zlib, then COSE_Sign1;
//! 2. [`trust`]: the signer's key id is resolved against the trust list;
//! 3. [`cose`]: the signature is checked over the original signed bytes;
//! 4. [`definitions`]: the payload is projected into a [`GreenPass`];
//! 5. [`validation`]: the vaccination is evaluated under a [`ScanMode`].
//!
//! [`verifier::Verifier`] runs the whole chain.
//!
//! [`GreenPass`]: definitions::GreenPass
//! [`ScanMode`]: validation::ScanMode
pub mod cbor;
pub mod cose;
pub mod decoder;
pub mod definitions;
pub mod revocation;
pub mod settings;
pub mod trust;
pub mod validation;
pub mod verifier;

pub use verifier::{Error, Verifier};
