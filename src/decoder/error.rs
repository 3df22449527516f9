/// Errors raised while turning a token into a [`SignedStructure`](crate::cose::sign1::SignedStructure).
///
/// All of these mean the input is malformed; none of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid text encoding: {0}")]
    InvalidEncoding(String),
    #[error("invalid compressed stream: {0}")]
    InvalidCompression(String),
    #[error("malformed signed structure: {0}")]
    MalformedStructure(String),
}

impl From<crate::cbor::CborError> for DecodeError {
    fn from(value: crate::cbor::CborError) -> Self {
        DecodeError::MalformedStructure(value.to_string())
    }
}

impl From<coset::CoseError> for DecodeError {
    fn from(value: coset::CoseError) -> Self {
        DecodeError::MalformedStructure(value.to_string())
    }
}
