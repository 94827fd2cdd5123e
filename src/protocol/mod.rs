//! Wire protocol
//!
//! Every record on the wire (and in a trace file) is a serialized
//! `(timestamp, payload)` pair. On the wire each record is preceded by its
//! length:
//!
//! ```text
//! +----------------------+---------------------------+
//! | Length (4 bytes, BE) | MessagePack record (N)    |
//! +----------------------+---------------------------+
//! ```
//!
//! There is no handshake and no acknowledgement. The server starts pushing
//! frames as soon as a subscriber connects; closing either side ends the
//! stream.

pub mod codec;
pub mod constants;

pub use codec::{decode_record, encode, encode_record, read_frame, write_frame, FrameDecoder};
