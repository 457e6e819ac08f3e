//! Line Framing
//!
//! This module turns a raw TCP byte stream into protocol lines and back.
//! The wire format is the one IRC uses: text frames terminated by CRLF,
//! with no length prefix and no maximum frame size.
//!
//! ## Modules
//!
//! - `codec`: Splits a byte buffer on CRLF and encodes outgoing lines
//! - `reader`: Lazy line sequence over an async reader
//!
//! ## Example
//!
//! ```ignore
//! use ircfront::protocol::{encode_line, LineReader};
//!
//! let mut lines = LineReader::new(read_half);
//! while let Some(line) = lines.next_line().await? {
//!     println!("irc -> {}", line);
//! }
//!
//! assert_eq!(&encode_line("PING :123")[..], b"PING :123\r\n");
//! ```

pub mod codec;
pub mod reader;

// Re-export commonly used types for convenience
pub use codec::{encode_line, LineCodec, CRLF};
pub use reader::LineReader;
