//! Constants for the STM acquisition-board serial protocol

// Framing tokens
pub const WAKE_BYTE: u8 = 0xA5; // host -> peer, starts a session
pub const START_PREFIX: &str = "START "; // followed by decimal record count
pub const TS_PREFIX: &str = "TS="; // followed by decimal seconds
pub const END_LINE: &str = "END";
pub const ACK_PREFIX: &str = "ACK "; // followed by max accepted timestamp

// Record geometry
pub const RECORD_SIZE: usize = 28; // fixed-layout binary sample incl. checksum
pub const HEX_LINE_LEN: usize = 2 * RECORD_SIZE; // 56 hex chars per record line
pub const CHECKSUM_SPAN: usize = RECORD_SIZE - 2; // bytes covered by the trailing CRC

// Field offsets within a record (little-endian)
pub const OFFSET_TIMESTAMP: usize = 0; // u32 seconds
pub const OFFSET_MAG_X: usize = 4; // i16, x100
pub const OFFSET_MAG_Y: usize = 6; // i16, x100
pub const OFFSET_MAG_Z: usize = 8; // i16, x100
pub const OFFSET_TEMPERATURE: usize = 10; // i16, degC x100
pub const OFFSET_PRESSURE: usize = 12; // i32, hPa x1000
pub const OFFSET_HUMIDITY: usize = 16; // i16, % x100
pub const OFFSET_ADC_RAW: usize = 18; // u16
pub const OFFSET_ADC_MILLIVOLTS: usize = 20; // u16
pub const OFFSET_RESERVED: usize = 22; // u32
pub const OFFSET_CHECKSUM: usize = 26; // u16

// Timing constants
pub const LINE_POLL_SLEEP_MS: u64 = 1;
pub const DEFAULT_LINE_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_CHUNK_PACING_MS: u64 = 5;

// Uplink
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 1200;
pub const CHUNK_HEADER_PREFIX: &str = "CHUNK ";
