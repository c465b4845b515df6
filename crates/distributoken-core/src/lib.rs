pub mod constants;
pub mod error;
pub mod types;
pub mod record;
pub mod operation;

pub use constants::*;
pub use error::DistributokenError;
pub use types::*;
pub use record::*;
pub use operation::*;
