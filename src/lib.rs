pub mod config;
pub mod db;
pub mod error;
pub mod prompt;
pub mod utils;

pub use error::GabineteError;
