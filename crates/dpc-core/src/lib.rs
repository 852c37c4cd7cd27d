pub mod cst;
pub mod detect;
pub mod error;
pub mod fix;
pub mod io;
pub mod patch;
pub mod workflow;

pub use error::{DpcError, ErrorKind, Result};
