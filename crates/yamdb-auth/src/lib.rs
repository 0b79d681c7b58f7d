pub mod code;
pub mod error;
pub mod token;

pub use code::generate_confirmation_code;
pub use error::{Error, Result};
