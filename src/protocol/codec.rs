//! Line codec for IRC connections.
//!
//! Framing and size limits live here; parsing and serialization are
//! `irc-proto`'s. Malformed lines are skipped instead of ending the stream.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::warn;

use crate::common::error::ProtocolError;
use crate::protocol::message::Message;

/// Maximum length of a line sent to the server, CR/LF included.
pub const MAX_LINE_LEN: usize = 512;

/// Inbound lines may carry IRCv3 tags, so accept more than 512 bytes.
const MAX_INBOUND_LEN: usize = 8191 + MAX_LINE_LEN;

/// Codec framing `\r\n`-terminated IRC lines.
#[derive(Debug, Default)]
pub struct IrcCodec {
    /// Bytes of the buffer already scanned for a newline.
    next_index: usize,
}

impl IrcCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

            let Some(offset) = newline else {
                if src.len() > MAX_INBOUND_LEN {
                    return Err(ProtocolError::LineTooLong {
                        len: src.len(),
                        max: MAX_INBOUND_LEN,
                    });
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            // Servers are not required to send valid UTF-8.
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);

            if text.trim().is_empty() {
                continue;
            }

            match text.parse::<Message>() {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    warn!("Skipping malformed line: {}", e);
                    continue;
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None => {
                // Unterminated trailing data from a dropped connection.
                src.clear();
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.to_string();
        // Embedded line breaks would let a reply inject extra commands.
        let line = line.trim_end_matches(['\r', '\n']).replace(['\r', '\n'], " ");

        if line.len() + 2 > MAX_LINE_LEN {
            return Err(ProtocolError::LineTooLong {
                len: line.len() + 2,
                max: MAX_LINE_LEN,
            });
        }

        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// A framed IRC connection.
pub type IrcConnection<S> = Framed<S, IrcCodec>;

/// Create a new IRC connection from a stream.
pub fn new_irc_connection<S: AsyncRead + AsyncWrite>(stream: S) -> IrcConnection<S> {
    Framed::new(stream, IrcCodec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::{self, Command, Response};

    #[test]
    fn test_decode_multiple_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from(&b"PING :a\r\n:srv 001 snurr :hi\r\nPART"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.command, Command::PING("a".to_string(), None));
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(second.command, Command::Response(Response::RPL_WELCOME, _)));
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b" #x\n");
        let third = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(third.command, Command::PART("#x".to_string(), None));
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from(&b"\r\n\r\nPING :x\r\n"[..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.command, Command::PING("x".to_string(), None));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from(&b":a!b@c PRIVMSG #x :caf\xe9\r\n"[..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            msg.command,
            Command::PRIVMSG("#x".to_string(), "caf\u{fffd}".to_string())
        );
    }

    #[test]
    fn test_decode_eof_drops_partial_line() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from(&b"PING :x\r\nPRIVMSG #x :cut"[..]);
        assert!(codec.decode_eof(&mut buf).unwrap().is_some());
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(message::join("#snurr"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"JOIN #snurr\r\n");
    }

    #[test]
    fn test_encode_strips_line_breaks() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(message::privmsg("#x", "a\r\nQUIT :bye"), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"PRIVMSG #x :a  QUIT :bye\r\n");
    }

    #[test]
    fn test_encode_rejects_long_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        let text = "x".repeat(600);
        assert!(matches!(
            codec.encode(message::privmsg("#x", &text), &mut buf),
            Err(ProtocolError::LineTooLong { .. })
        ));
        assert!(buf.is_empty());
    }
}
