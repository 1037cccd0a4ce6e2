pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod transaction;
pub mod validation;

pub use self::config::*;
pub use error::*;
pub use logging::*;
pub use validation::*;
