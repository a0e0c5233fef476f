//! Best-effort datagram delivery to the network relay

mod chunk;

pub use chunk::{ChunkedSender, DatagramSink, UdpSink};
