mod gabinete;

pub use gabinete::{ApiErrorBody, ApiErrorObject, GabineteError, IntegrityKind};
