//! One full acquisition session with the sensor board
//!
//! Sequence: wake byte -> `START <N>` -> N x (`TS=<sec>` + hex record)
//! -> `END` -> `ACK <max_ts>`. Framing tokens define the stream's
//! structural boundaries; losing one desynchronizes every read after
//! it, so START/END failures abort the session with no partial result.
//! A corrupt record only affects that sample and is tallied instead.

use crate::error::{Error, Result};
use crate::protocol::checksum::ChecksumMode;
use crate::protocol::constants::{
    ACK_PREFIX, DEFAULT_LINE_TIMEOUT_MS, END_LINE, START_PREFIX, TS_PREFIX, WAKE_BYTE,
};
use crate::protocol::line::LineReader;
use crate::protocol::record::{RecordError, SensorRecord};
use crate::transport::Transport;
use std::time::Duration;

/// Per-session settings
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// CRC variant the board firmware was built with
    pub checksum_mode: ChecksumMode,
    /// Deadline applied to each expected line, not to the whole session
    pub line_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            checksum_mode: ChecksumMode::Modbus,
            line_timeout: Duration::from_millis(DEFAULT_LINE_TIMEOUT_MS),
        }
    }
}

/// Outcome of one completed session
///
/// Created fresh on every invocation; nothing carries over between
/// sessions.
#[derive(Debug, Clone)]
pub struct SessionResult {
    /// Aggregated payload: `{"data":[<record>,...]}`
    pub json: String,
    /// Maximum timestamp among accepted records (0 if none)
    pub max_timestamp: u32,
    /// Records that decoded and validated
    pub accepted: u32,
    /// Records dropped for corruption or mismatch
    pub rejected: u32,
}

/// Session context, one per caller
///
/// Holds no transport state; the transport is passed into [`run`] so
/// independent instances stay independently testable.
///
/// [`run`]: Session::run
pub struct Session {
    config: SessionConfig,
    reader: LineReader,
}

impl Session {
    /// Create a session context
    pub fn new(config: SessionConfig) -> Self {
        let reader = LineReader::new(config.line_timeout);
        Session { config, reader }
    }

    /// Run one complete exchange with the board
    ///
    /// Fatal outcomes (`Timeout` on a framing line, `Framing`, or a
    /// transport write failure) return `Err` with no partial result
    /// and no ACK sent. Per-record corruption is non-fatal and only
    /// increments the rejected counter.
    pub fn run<T: Transport>(&self, io: &mut T) -> Result<SessionResult> {
        // 1) Wake the board
        io.write_all(&[WAKE_BYTE])?;
        io.flush()?;

        // 2) START <count>
        let line = self.reader.read_line(io)?;
        let Some(count_str) = line.strip_prefix(START_PREFIX) else {
            return Err(Error::Framing(format!("expected START line, got {:?}", line)));
        };
        let count: u32 = count_str
            .trim()
            .parse()
            .map_err(|_| Error::Framing(format!("bad record count in START line: {:?}", line)))?;
        log::debug!("Session start: {} records announced", count);

        // 3) Record loop
        let mut json = String::from("{\"data\":[");
        let mut first = true;
        let mut max_timestamp: u32 = 0;
        let mut accepted: u32 = 0;
        let mut rejected: u32 = 0;

        for i in 0..count {
            match self.read_record(io) {
                Ok(record) => {
                    if !first {
                        json.push(',');
                    }
                    json.push_str(&record.to_json());
                    first = false;

                    if record.timestamp > max_timestamp {
                        max_timestamp = record.timestamp;
                    }
                    accepted += 1;
                }
                Err(e) => {
                    log::warn!("Record {}/{} rejected: {}", i + 1, count, e);
                    rejected += 1;
                }
            }
        }

        // 4) END
        let line = self.reader.read_line(io)?;
        if line != END_LINE {
            return Err(Error::Framing(format!("expected END line, got {:?}", line)));
        }

        // 5) ACK <max accepted timestamp>
        let ack = format!("{}{}\n", ACK_PREFIX, max_timestamp);
        io.write_all(ack.as_bytes())?;
        io.flush()?;

        json.push_str("]}");
        log::info!(
            "Session complete: {} accepted, {} rejected, max_ts={}",
            accepted,
            rejected,
            max_timestamp
        );

        Ok(SessionResult {
            json,
            max_timestamp,
            accepted,
            rejected,
        })
    }

    /// Read one `TS=` + hex-record pair
    ///
    /// A timeout on the TS line skips the hex read for this iteration;
    /// the board emits both lines back to back, so a missing TS line
    /// means the pair never arrived.
    fn read_record<T: Transport>(&self, io: &mut T) -> std::result::Result<SensorRecord, RecordError> {
        let ts_line = match self.reader.read_line(io) {
            Ok(l) => l,
            Err(_) => return Err(RecordError::MissingLine),
        };
        let announced: u32 = ts_line
            .strip_prefix(TS_PREFIX)
            .and_then(|s| s.trim().parse().ok())
            .ok_or(RecordError::MalformedTsLine)?;

        let hex_line = match self.reader.read_line(io) {
            Ok(l) => l,
            Err(_) => return Err(RecordError::MissingLine),
        };

        let record = SensorRecord::decode_hex(&hex_line, self.config.checksum_mode)?;
        if record.timestamp != announced {
            return Err(RecordError::TimestampMismatch {
                line: announced,
                embedded: record.timestamp,
            });
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::WAKE_BYTE;
    use crate::transport::MockTransport;

    fn test_config() -> SessionConfig {
        SessionConfig {
            checksum_mode: ChecksumMode::Modbus,
            line_timeout: Duration::from_millis(50),
        }
    }

    fn record(ts: u32) -> SensorRecord {
        SensorRecord {
            timestamp: ts,
            mag_x: 100,
            mag_y: -200,
            mag_z: 300,
            temperature: 2100,
            pressure: 1000000,
            humidity: 5000,
            adc_raw: 1024,
            adc_millivolts: 825,
            reserved: 0,
            checksum: 0,
        }
        .seal(ChecksumMode::Modbus)
    }

    fn inject_record(io: &MockTransport, rec: &SensorRecord) {
        io.inject_line(&format!("TS={}", rec.timestamp));
        io.inject_line(&rec.encode_hex());
    }

    #[test]
    fn test_happy_path() {
        let mut io = MockTransport::new();
        io.inject_line("START 2");
        inject_record(&io, &record(100));
        inject_record(&io, &record(200));
        io.inject_line("END");

        let result = Session::new(test_config()).run(&mut io).unwrap();
        assert_eq!(result.accepted, 2);
        assert_eq!(result.rejected, 0);
        assert_eq!(result.max_timestamp, 200);

        // Wake byte first, ACK with the max timestamp last.
        let written = io.get_written();
        assert_eq!(written[0], WAKE_BYTE);
        assert_eq!(&written[1..], b"ACK 200\n");
    }

    #[test]
    fn test_corrupt_middle_record_is_nonfatal() {
        let mut io = MockTransport::new();
        io.inject_line("START 3");
        inject_record(&io, &record(100));

        // Record 2: corrupt the checksum field
        let bad = record(150);
        let mut line = bad.encode_hex();
        line.replace_range(52..56, "0000");
        io.inject_line("TS=150");
        io.inject_line(&line);

        inject_record(&io, &record(300));
        io.inject_line("END");

        let result = Session::new(test_config()).run(&mut io).unwrap();
        assert_eq!(result.accepted, 2);
        assert_eq!(result.rejected, 1);
        assert_eq!(result.max_timestamp, 300);

        let v: serde_json::Value = serde_json::from_str(&result.json).unwrap();
        assert_eq!(v["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_timestamp_mismatch_rejected() {
        let mut io = MockTransport::new();
        io.inject_line("START 1");
        io.inject_line("TS=999"); // record itself says 100
        io.inject_line(&record(100).encode_hex());
        io.inject_line("END");

        let result = Session::new(test_config()).run(&mut io).unwrap();
        assert_eq!(result.accepted, 0);
        assert_eq!(result.rejected, 1);
        assert_eq!(result.max_timestamp, 0);
        assert!(io.get_written().ends_with(b"ACK 0\n"));
    }

    #[test]
    fn test_missing_start_is_fatal() {
        let mut io = MockTransport::new();
        let err = Session::new(test_config()).run(&mut io).unwrap_err();
        assert!(matches!(err, Error::Timeout));
        // No ACK after a fatal failure; only the wake byte went out.
        assert_eq!(io.get_written(), vec![WAKE_BYTE]);
    }

    #[test]
    fn test_malformed_start_is_fatal() {
        let mut io = MockTransport::new();
        io.inject_line("START x");
        assert!(matches!(
            Session::new(test_config()).run(&mut io),
            Err(Error::Framing(_))
        ));
    }

    #[test]
    fn test_misspelled_end_is_fatal() {
        let mut io = MockTransport::new();
        io.inject_line("START 1");
        inject_record(&io, &record(100));
        io.inject_line("EMD");

        let err = Session::new(test_config()).run(&mut io).unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
        assert_eq!(io.get_written(), vec![WAKE_BYTE]);
    }

    #[test]
    fn test_missing_end_is_fatal() {
        let mut io = MockTransport::new();
        io.inject_line("START 1");
        inject_record(&io, &record(100));
        // END never arrives

        assert!(matches!(
            Session::new(test_config()).run(&mut io),
            Err(Error::Timeout)
        ));
    }

    #[test]
    fn test_zero_records() {
        let mut io = MockTransport::new();
        io.inject_line("START 0");
        io.inject_line("END");

        let result = Session::new(test_config()).run(&mut io).unwrap();
        assert_eq!(result.accepted, 0);
        assert_eq!(result.rejected, 0);
        assert_eq!(result.json, "{\"data\":[]}");
        assert!(io.get_written().ends_with(b"ACK 0\n"));
    }

    #[test]
    fn test_ccitt_mode_session() {
        let config = SessionConfig {
            checksum_mode: ChecksumMode::Ccitt,
            line_timeout: Duration::from_millis(50),
        };
        let rec = SensorRecord {
            checksum: 0,
            ..record(42)
        }
        .seal(ChecksumMode::Ccitt);

        let mut io = MockTransport::new();
        io.inject_line("START 1");
        inject_record(&io, &rec);
        io.inject_line("END");

        let result = Session::new(config).run(&mut io).unwrap();
        assert_eq!(result.accepted, 1);
        assert_eq!(result.max_timestamp, 42);
    }
}
