//! CRLF Line Codec
//!
//! This module converts between a raw byte buffer and protocol lines.
//! IRC-style protocols terminate every line with CRLF (`\r\n`); there is
//! no length prefix, no escaping, and no maximum line size.
//!
//! ## How the Codec Works
//!
//! The codec operates on a `BytesMut` buffer that the caller keeps
//! appending network data to:
//!
//! 1. Append incoming bytes to the buffer
//! 2. Call `decode()` until it returns `None`
//! 3. Each `Some(line)` has already been removed from the buffer,
//!    together with its delimiter
//! 4. Whatever is left is a partial line waiting for more data
//!
//! ```text
//! buffer: "NICK foo\r\nUSER ba"
//!              │
//!     decode() ├──> Some("NICK foo")
//!     decode() └──> None            buffer: "USER ba"
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// The line delimiter.
pub const CRLF: &[u8] = b"\r\n";

/// Splits a byte buffer into CRLF-delimited lines and back.
///
/// The codec is stateful only as an optimisation: it remembers how much of
/// the buffer it has already scanned without finding a delimiter, so a
/// client trickling in a long line is not rescanned from the start on
/// every read.
#[derive(Debug, Default, Clone)]
pub struct LineCodec {
    /// Bytes of the buffer already known to contain no complete delimiter
    scanned: usize,
}

impl LineCodec {
    /// Creates a new codec.
    pub fn new() -> Self {
        Self { scanned: 0 }
    }

    /// Attempts to take one complete line off the front of `buf`.
    ///
    /// Returns `None` when the buffer holds no delimiter; the buffer is left
    /// untouched in that case. Empty lines are returned as empty strings.
    /// Bytes that are not valid UTF-8 are replaced rather than rejected.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Option<String> {
        // Back up one byte: a CR may have arrived at the end of the last read.
        let start = self.scanned.saturating_sub(1).min(buf.len());

        match find_crlf(&buf[start..]) {
            Some(pos) => {
                let line = buf.split_to(start + pos);
                buf.advance(CRLF.len());
                self.scanned = 0;
                Some(String::from_utf8_lossy(&line).into_owned())
            }
            None => {
                self.scanned = buf.len();
                None
            }
        }
    }

    /// Takes the unterminated fragment left in `buf`, if any.
    ///
    /// Used at end of stream, when no delimiter can arrive any more.
    pub fn take_remainder(&mut self, buf: &mut BytesMut) -> Option<BytesMut> {
        self.scanned = 0;
        if buf.is_empty() {
            None
        } else {
            Some(buf.split())
        }
    }

    /// Appends `line` and the delimiter to `dst`.
    ///
    /// The caller guarantees `line` does not itself contain CRLF.
    pub fn encode(&self, line: &str, dst: &mut BytesMut) {
        dst.reserve(line.len() + CRLF.len());
        dst.put_slice(line.as_bytes());
        dst.put_slice(CRLF);
    }
}

/// Encodes a single line into its wire form.
pub fn encode_line(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + CRLF.len());
    LineCodec::new().encode(line, &mut buf);
    buf.freeze()
}

/// Finds the position of the first CRLF in the buffer.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LineCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = codec.decode(buf) {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_decode_two_commands() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"NICK foo\r\nUSER bar\r\n"[..]);

        assert_eq!(decode_all(&mut codec, &mut buf), vec!["NICK foo", "USER bar"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_empty_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"\r\n\r\n"[..]);

        assert_eq!(decode_all(&mut codec, &mut buf), vec!["", ""]);
    }

    #[test]
    fn test_decode_keeps_partial_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PING :1\r\nPRIVMSG #rust :hel"[..]);

        assert_eq!(codec.decode(&mut buf), Some("PING :1".to_string()));
        assert_eq!(codec.decode(&mut buf), None);
        assert_eq!(&buf[..], b"PRIVMSG #rust :hel");

        buf.extend_from_slice(b"lo\r\n");
        assert_eq!(codec.decode(&mut buf), Some("PRIVMSG #rust :hello".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_delimiter_split_across_reads() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"JOIN #a\r"[..]);

        assert_eq!(codec.decode(&mut buf), None);

        buf.extend_from_slice(b"\nPART #a\r\n");
        assert_eq!(decode_all(&mut codec, &mut buf), vec!["JOIN #a", "PART #a"]);
    }

    #[test]
    fn test_bare_lf_and_cr_are_content() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"a\nb\rc\r\n"[..]);

        assert_eq!(codec.decode(&mut buf), Some("a\nb\rc".to_string()));
    }

    #[test]
    fn test_decode_invalid_utf8_is_not_an_error() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"caf\xe9\r\n"[..]);

        assert_eq!(codec.decode(&mut buf), Some("caf\u{fffd}".to_string()));
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let input: &[u8] = b"NICK foo\r\nUSER bar 0 * :Real Name\r\n\r\nJOIN #rust\r\nPRIV";

        let mut whole_codec = LineCodec::new();
        let mut whole = BytesMut::from(input);
        let expected = decode_all(&mut whole_codec, &mut whole);

        for chunk_size in [1, 2, 3, 7] {
            let mut codec = LineCodec::new();
            let mut buf = BytesMut::new();
            let mut lines = Vec::new();

            for chunk in input.chunks(chunk_size) {
                buf.extend_from_slice(chunk);
                lines.extend(decode_all(&mut codec, &mut buf));
            }

            assert_eq!(lines, expected, "chunk size {}", chunk_size);
            assert_eq!(buf, whole, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_reassembly_reproduces_input() {
        let inputs: [&[u8]; 4] = [
            b"NICK foo\r\nUSER bar\r\n",
            b"\r\n\r\nlonely",
            b"no delimiter at all",
            b"a\r\r\nb\n\r\nc\r",
        ];

        for input in inputs {
            let mut codec = LineCodec::new();
            let mut buf = BytesMut::from(input);
            let lines = decode_all(&mut codec, &mut buf);

            let mut rebuilt = BytesMut::new();
            for line in &lines {
                codec.encode(line, &mut rebuilt);
            }
            rebuilt.extend_from_slice(&buf);

            assert_eq!(&rebuilt[..], input);
        }
    }

    #[test]
    fn test_take_remainder() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"QUIT :bye\r\nhalf"[..]);

        assert!(codec.decode(&mut buf).is_some());
        assert!(codec.decode(&mut buf).is_none());
        assert_eq!(codec.take_remainder(&mut buf).as_deref(), Some(&b"half"[..]));
        assert!(codec.take_remainder(&mut buf).is_none());
    }

    #[test]
    fn test_encode_line() {
        assert_eq!(&encode_line("PING :123")[..], b"PING :123\r\n");
        assert_eq!(&encode_line("")[..], b"\r\n");
    }
}
