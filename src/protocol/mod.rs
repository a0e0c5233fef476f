//! Serial line protocol with the acquisition board

pub mod checksum;
pub mod constants;
pub mod line;
pub mod record;
pub mod session;

pub use checksum::ChecksumMode;
pub use line::LineReader;
pub use record::{RecordError, SensorRecord};
pub use session::{Session, SessionConfig, SessionResult};
