mod certificate;
pub mod trust_anchor;
pub mod util;

pub use certificate::CertificateWithDer;
pub use trust_anchor::{KeyAlgorithm, TrustAnchor, TrustAnchorRegistry};
