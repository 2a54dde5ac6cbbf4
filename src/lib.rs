pub mod accession;
pub mod errors;
pub mod extract;
pub mod names;
pub mod options;
pub mod results;
pub mod seq_index;
pub mod taxonomy;
pub mod utilities;

pub use errors::{Result, SubnxError};
