pub mod error;
pub mod record;
pub mod token;

pub use error::{OccError, Result};
pub use record::{RecordKey, Sequenced, Timestamped, VersionedRecord};
pub use token::VersionToken;
