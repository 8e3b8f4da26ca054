pub mod dialect;
pub mod error;

pub use dialect::Dialect;
pub use error::{Error, Result};
