//! Fixed-layout sensor record codec
//!
//! One record is 28 bytes, little-endian, transmitted as a 56-char hex
//! line with its CRC-16 in the trailing two bytes. Decoding is
//! field-by-field at the offsets in [`crate::protocol::constants`], no
//! packed-struct reinterpretation, so layout and endianness stay
//! explicit.
//!
//! Decode failures are never fatal: corruption of one record must not
//! abort the batch, so this module only ever reports success/failure
//! to the session layer.

use crate::protocol::checksum::ChecksumMode;
use crate::protocol::constants::{
    CHECKSUM_SPAN, HEX_LINE_LEN, OFFSET_ADC_MILLIVOLTS, OFFSET_ADC_RAW, OFFSET_CHECKSUM,
    OFFSET_HUMIDITY, OFFSET_MAG_X, OFFSET_MAG_Y, OFFSET_MAG_Z, OFFSET_PRESSURE, OFFSET_RESERVED,
    OFFSET_TEMPERATURE, OFFSET_TIMESTAMP, RECORD_SIZE,
};
use std::fmt::Write as _;

/// Non-fatal record decode failure
///
/// Tallied as a rejected record by the session; never aborts a batch.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    /// Hex line length differs from the expected 56 characters
    #[error("Wrong hex line length: expected {expected}, got {actual}")]
    WrongLength {
        /// Expected character count
        expected: usize,
        /// Actual character count
        actual: usize,
    },

    /// Line contains a character that is not a hex digit
    #[error("Invalid hex digit at position {0}")]
    InvalidHex(usize),

    /// Recomputed CRC does not match the trailing checksum field
    #[error("Checksum error: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch {
        /// Checksum embedded in the record
        expected: u16,
        /// Checksum recomputed over the record body
        actual: u16,
    },

    /// Embedded timestamp disagrees with the announced `TS=` value
    #[error("Timestamp mismatch: TS line says {line}, record says {embedded}")]
    TimestampMismatch {
        /// Timestamp from the `TS=` line
        line: u32,
        /// Timestamp decoded from the record
        embedded: u32,
    },

    /// `TS=` line missing or its seconds field unparsable
    #[error("Malformed TS line")]
    MalformedTsLine,

    /// Expected record line never arrived before the deadline
    #[error("Record line missing before deadline")]
    MissingLine,
}

/// One decoded acquisition sample, immutable once parsed
///
/// Scaled integer fields keep their stored representation; scaling to
/// engineering units happens only in [`SensorRecord::to_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRecord {
    /// Sample time, seconds
    pub timestamp: u32,
    /// Magnetometer X axis, x100
    pub mag_x: i16,
    /// Magnetometer Y axis, x100
    pub mag_y: i16,
    /// Magnetometer Z axis, x100
    pub mag_z: i16,
    /// Temperature, degC x100
    pub temperature: i16,
    /// Pressure, hPa x1000
    pub pressure: i32,
    /// Relative humidity, % x100
    pub humidity: i16,
    /// Raw ADC reading
    pub adc_raw: u16,
    /// ADC reading in millivolts
    pub adc_millivolts: u16,
    /// Reserved field, carried through untouched
    pub reserved: u32,
    /// Trailing CRC-16 over the preceding 26 bytes
    pub checksum: u16,
}

impl SensorRecord {
    /// Decode a 56-character hex line and validate its checksum
    pub fn decode_hex(line: &str, mode: ChecksumMode) -> Result<Self, RecordError> {
        let bytes = parse_hex_line(line)?;
        let record = Self::from_bytes(&bytes);

        let computed = mode.compute(&bytes[..CHECKSUM_SPAN]);
        if computed != record.checksum {
            return Err(RecordError::ChecksumMismatch {
                expected: record.checksum,
                actual: computed,
            });
        }

        Ok(record)
    }

    /// Build a record from its wire bytes without checksum validation
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        SensorRecord {
            timestamp: u32::from_le_bytes(field(bytes, OFFSET_TIMESTAMP)),
            mag_x: i16::from_le_bytes(field(bytes, OFFSET_MAG_X)),
            mag_y: i16::from_le_bytes(field(bytes, OFFSET_MAG_Y)),
            mag_z: i16::from_le_bytes(field(bytes, OFFSET_MAG_Z)),
            temperature: i16::from_le_bytes(field(bytes, OFFSET_TEMPERATURE)),
            pressure: i32::from_le_bytes(field(bytes, OFFSET_PRESSURE)),
            humidity: i16::from_le_bytes(field(bytes, OFFSET_HUMIDITY)),
            adc_raw: u16::from_le_bytes(field(bytes, OFFSET_ADC_RAW)),
            adc_millivolts: u16::from_le_bytes(field(bytes, OFFSET_ADC_MILLIVOLTS)),
            reserved: u32::from_le_bytes(field(bytes, OFFSET_RESERVED)),
            checksum: u16::from_le_bytes(field(bytes, OFFSET_CHECKSUM)),
        }
    }

    /// Serialize to wire bytes, including the current checksum field
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[OFFSET_TIMESTAMP..OFFSET_TIMESTAMP + 4].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[OFFSET_MAG_X..OFFSET_MAG_X + 2].copy_from_slice(&self.mag_x.to_le_bytes());
        bytes[OFFSET_MAG_Y..OFFSET_MAG_Y + 2].copy_from_slice(&self.mag_y.to_le_bytes());
        bytes[OFFSET_MAG_Z..OFFSET_MAG_Z + 2].copy_from_slice(&self.mag_z.to_le_bytes());
        bytes[OFFSET_TEMPERATURE..OFFSET_TEMPERATURE + 2]
            .copy_from_slice(&self.temperature.to_le_bytes());
        bytes[OFFSET_PRESSURE..OFFSET_PRESSURE + 4].copy_from_slice(&self.pressure.to_le_bytes());
        bytes[OFFSET_HUMIDITY..OFFSET_HUMIDITY + 2].copy_from_slice(&self.humidity.to_le_bytes());
        bytes[OFFSET_ADC_RAW..OFFSET_ADC_RAW + 2].copy_from_slice(&self.adc_raw.to_le_bytes());
        bytes[OFFSET_ADC_MILLIVOLTS..OFFSET_ADC_MILLIVOLTS + 2]
            .copy_from_slice(&self.adc_millivolts.to_le_bytes());
        bytes[OFFSET_RESERVED..OFFSET_RESERVED + 4].copy_from_slice(&self.reserved.to_le_bytes());
        bytes[OFFSET_CHECKSUM..OFFSET_CHECKSUM + 2].copy_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    /// Compute and store the checksum for the given mode
    pub fn seal(mut self, mode: ChecksumMode) -> Self {
        let bytes = self.to_bytes();
        self.checksum = mode.compute(&bytes[..CHECKSUM_SPAN]);
        self
    }

    /// Encode as the lowercase hex line the board would transmit
    pub fn encode_hex(&self) -> String {
        let bytes = self.to_bytes();
        let mut line = String::with_capacity(HEX_LINE_LEN);
        for b in bytes {
            let _ = write!(line, "{:02x}", b);
        }
        line
    }

    /// Render one JSON object with the documented scale factors
    ///
    /// Decimal places are part of the relay's wire contract (two for
    /// temp/humid/adc_mV/mag axes, three for pressure), so formatting
    /// is explicit rather than left to a serializer.
    pub fn to_json(&self) -> String {
        format!(
            "{{\"time\":{},\"temp\":{:.2},\"press\":{:.3},\"humid\":{:.2},\
             \"adc_mV\":{:.2},\"mag\":{{\"mag_x\":{:.2},\"mag_y\":{:.2},\"mag_z\":{:.2}}}}}",
            self.timestamp,
            self.temperature as f64 / 100.0,
            self.pressure as f64 / 1000.0,
            self.humidity as f64 / 100.0,
            self.adc_millivolts as f64,
            self.mag_x as f64 / 100.0,
            self.mag_y as f64 / 100.0,
            self.mag_z as f64 / 100.0,
        )
    }
}

/// Copy an N-byte field out of the record buffer
#[inline]
fn field<const N: usize>(bytes: &[u8; RECORD_SIZE], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

/// Parse exactly [`HEX_LINE_LEN`] hex characters into record bytes
fn parse_hex_line(line: &str) -> Result<[u8; RECORD_SIZE], RecordError> {
    if line.len() != HEX_LINE_LEN {
        return Err(RecordError::WrongLength {
            expected: HEX_LINE_LEN,
            actual: line.len(),
        });
    }

    let mut bytes = [0u8; RECORD_SIZE];
    let chars = line.as_bytes();
    for (i, byte) in bytes.iter_mut().enumerate() {
        let hi = hex_value(chars[2 * i]).ok_or(RecordError::InvalidHex(2 * i))?;
        let lo = hex_value(chars[2 * i + 1]).ok_or(RecordError::InvalidHex(2 * i + 1))?;
        *byte = (hi << 4) | lo;
    }
    Ok(bytes)
}

#[inline]
fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(10 + c - b'a'),
        b'A'..=b'F' => Some(10 + c - b'A'),
        _ => None,
    }
}
