//! Chunked datagram delivery to the relay
//!
//! The aggregated JSON for a large batch can exceed what one datagram
//! practically carries, so oversized payloads are split into sequenced
//! fragments: `CHUNK <sid> <index>/<total> ` followed by that slice's
//! raw bytes. Delivery is best-effort; the receiver reassembles purely
//! from the index/total fields and there is no ack or retransmission.

use crate::error::{Error, Result};
use crate::protocol::constants::CHUNK_HEADER_PREFIX;
use std::io::Write as _;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Destination for one datagram
pub trait DatagramSink: Send {
    /// Send one datagram; success mirrors the transport call
    fn send(&mut self, dest: SocketAddr, payload: &[u8]) -> Result<()>;
}

/// UDP socket sink
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    /// Bind a send-only socket on an ephemeral port
    pub fn new() -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| Error::Other(format!("Failed to create UDP socket: {}", e)))?;
        Ok(UdpSink { socket })
    }
}

impl DatagramSink for UdpSink {
    fn send(&mut self, dest: SocketAddr, payload: &[u8]) -> Result<()> {
        self.socket.send_to(payload, dest)?;
        Ok(())
    }
}

/// Splits oversized payloads into sequenced datagram fragments
pub struct ChunkedSender<S: DatagramSink> {
    sink: S,
    max_chunk_bytes: usize,
    pacing: Duration,
}

impl<S: DatagramSink> ChunkedSender<S> {
    /// Create a sender
    ///
    /// `max_chunk_bytes` is the largest payload slice per datagram;
    /// `pacing` separates consecutive chunk sends to avoid bursting.
    pub fn new(sink: S, max_chunk_bytes: usize, pacing: Duration) -> Self {
        ChunkedSender {
            sink,
            max_chunk_bytes,
            pacing,
        }
    }

    /// Send `payload` to `dest`, splitting if it exceeds the chunk size
    ///
    /// A payload that fits goes out as a single unmodified datagram.
    /// Otherwise every fragment carries a `CHUNK <sid> <i>/<total> `
    /// header sharing one session id for the whole call. The first
    /// send failure halts the remaining chunks and is returned.
    pub fn send(&mut self, dest: SocketAddr, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Err(Error::InvalidParameter("empty uplink payload".to_string()));
        }

        if payload.len() <= self.max_chunk_bytes {
            return self.sink.send(dest, payload);
        }

        let sid = session_id();
        let total = payload.len().div_ceil(self.max_chunk_bytes);
        log::debug!(
            "Chunking {} bytes into {} datagrams (sid={})",
            payload.len(),
            total,
            sid
        );

        // Reused send buffer, header + slice per datagram
        let mut buffer: Vec<u8> = Vec::with_capacity(self.max_chunk_bytes + 32);
        for (index, slice) in payload.chunks(self.max_chunk_bytes).enumerate() {
            buffer.clear();
            let _ = write!(buffer, "{}{} {}/{} ", CHUNK_HEADER_PREFIX, sid, index + 1, total);
            buffer.extend_from_slice(slice);

            if let Err(e) = self.sink.send(dest, &buffer) {
                log::warn!("Chunk {}/{} send failed, aborting remainder", index + 1, total);
                return Err(e);
            }

            std::thread::sleep(self.pacing);
        }

        Ok(())
    }
}

/// Coarse per-call session id from the wall-clock millisecond counter
///
/// Wraps every ~65s and is not unique across restarts; the receiver
/// defines no disambiguation contract that would justify more.
fn session_id() -> u16 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u16)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every datagram; can be told to fail from the Nth send on
    #[derive(Clone)]
    struct MockSink {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        fail_from: Option<usize>, // 1-based send ordinal
    }

    impl MockSink {
        fn new() -> Self {
            MockSink {
                sent: Arc::new(Mutex::new(Vec::new())),
                fail_from: None,
            }
        }

        fn failing_from(n: usize) -> Self {
            MockSink {
                fail_from: Some(n),
                ..Self::new()
            }
        }

        fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl DatagramSink for MockSink {
        fn send(&mut self, _dest: SocketAddr, payload: &[u8]) -> Result<()> {
            let mut sent = self.sent.lock().unwrap();
            if let Some(n) = self.fail_from {
                if sent.len() + 1 >= n {
                    return Err(Error::Other("simulated send failure".to_string()));
                }
            }
            sent.push(payload.to_vec());
            Ok(())
        }
    }

    fn dest() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn sender(sink: MockSink, max: usize) -> ChunkedSender<MockSink> {
        ChunkedSender::new(sink, max, Duration::from_millis(0))
    }

    /// Split `CHUNK <sid> <i>/<tot> ` off a datagram body
    fn parse_header(datagram: &[u8]) -> (u16, usize, usize, Vec<u8>) {
        let space_positions: Vec<usize> = datagram
            .iter()
            .enumerate()
            .filter(|(_, &b)| b == b' ')
            .map(|(i, _)| i)
            .take(3)
            .collect();
        let header = std::str::from_utf8(&datagram[..space_positions[2]]).unwrap();
        let mut parts = header.split(' ');
        assert_eq!(parts.next(), Some("CHUNK"));
        let sid: u16 = parts.next().unwrap().parse().unwrap();
        let (idx, tot) = parts.next().unwrap().split_once('/').unwrap();
        (
            sid,
            idx.parse().unwrap(),
            tot.parse().unwrap(),
            datagram[space_positions[2] + 1..].to_vec(),
        )
    }

    #[test]
    fn test_small_payload_sent_unmodified() {
        let sink = MockSink::new();
        let mut sender = sender(sink.clone(), 1200);
        let payload = b"{\"data\":[]}";

        sender.send(dest(), payload).unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], payload);
    }

    #[test]
    fn test_exact_fit_is_single_datagram() {
        let sink = MockSink::new();
        let mut sender = sender(sink.clone(), 100);
        let payload = vec![b'x'; 100];

        sender.send(dest(), &payload).unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], payload);
    }

    #[test]
    fn test_chunk_reconstruction() {
        let sink = MockSink::new();
        let mut sender = sender(sink.clone(), 1200);
        let payload: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();

        sender.send(dest(), &payload).unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 3);

        let mut reassembled = Vec::new();
        let mut sids = Vec::new();
        for (i, datagram) in sent.iter().enumerate() {
            let (sid, idx, tot, body) = parse_header(datagram);
            assert_eq!(idx, i + 1);
            assert_eq!(tot, 3);
            sids.push(sid);
            reassembled.extend_from_slice(&body);
        }
        assert!(sids.windows(2).all(|w| w[0] == w[1]), "one sid per call");
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn test_partial_failure_halts_remaining_chunks() {
        let sink = MockSink::failing_from(2);
        let mut sender = sender(sink.clone(), 1000);
        let payload = vec![b'y'; 2500]; // would be 3 chunks

        let err = sender.send(dest(), &payload).unwrap_err();
        assert!(matches!(err, Error::Other(_)));

        // Only chunk 1 went out; nothing after the failing send.
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        let (_, idx, tot, _) = parse_header(&sent[0]);
        assert_eq!((idx, tot), (1, 3));
    }

    #[test]
    fn test_empty_payload_rejected() {
        let sink = MockSink::new();
        let mut sender = sender(sink.clone(), 1200);
        assert!(matches!(
            sender.send(dest(), b""),
            Err(Error::InvalidParameter(_))
        ));
        assert!(sink.sent().is_empty());
    }
}
