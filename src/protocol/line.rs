//! Deadline-bounded line reads over a [`Transport`]
//!
//! The acquisition board answers at its own pace, so every read gets a
//! fresh deadline. Blocking without a deadline would make the fatal
//! timeout handling in the session layer impossible.

use crate::error::{Error, Result};
use crate::protocol::constants::LINE_POLL_SLEEP_MS;
use crate::transport::Transport;
use std::time::{Duration, Instant};

/// Reads newline-terminated lines with a per-call deadline
pub struct LineReader {
    timeout: Duration,
}

impl LineReader {
    /// Create a reader with the given per-line timeout
    pub fn new(timeout: Duration) -> Self {
        LineReader { timeout }
    }

    /// Read the next line, excluding the terminator
    ///
    /// A `\r` immediately preceding the `\n` is stripped; nothing else
    /// is filtered. Polls the transport and yields for
    /// [`LINE_POLL_SLEEP_MS`] between polls until a terminator is seen
    /// or the deadline passes.
    ///
    /// On timeout, any partial input consumed by this call is
    /// discarded and `Err(Error::Timeout)` is returned; the next call
    /// starts clean.
    pub fn read_line<T: Transport>(&self, io: &mut T) -> Result<String> {
        let deadline = Instant::now() + self.timeout;
        let mut line: Vec<u8> = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            if io.available()? == 0 {
                if Instant::now() >= deadline {
                    if !line.is_empty() {
                        log::debug!("Discarding {} partial bytes on line timeout", line.len());
                    }
                    return Err(Error::Timeout);
                }
                std::thread::sleep(Duration::from_millis(LINE_POLL_SLEEP_MS));
                continue;
            }

            // One byte at a time so we never consume past the terminator
            let n = io.read(&mut byte)?;
            if n == 0 {
                continue;
            }

            match byte[0] {
                b'\n' => {
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    return Ok(String::from_utf8_lossy(&line).into_owned());
                }
                b => line.push(b),
            }
        }
    }
}
