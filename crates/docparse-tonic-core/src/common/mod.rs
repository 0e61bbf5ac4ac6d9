pub mod codec;
pub mod error;
pub mod options;

pub use error::{Error, Result};
pub use options::OptionSet;
