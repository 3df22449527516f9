pub mod fulldate;
pub mod greenpass;
pub mod holder;
pub mod vaccination;
pub mod x509;

pub use fulldate::{BirthDate, FullDate};
pub use greenpass::{CertificateType, GreenPass, ProjectionError};
pub use holder::{Holder, Names};
pub use vaccination::VaccinationDose;
