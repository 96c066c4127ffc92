//! [tokio_util::codec] implementation of the server side of the protocol.
//!
//! ```ignore
//! use futures_util::{SinkExt, StreamExt};
//! use tokio_util::codec::Framed;
//! use xvc_protocol::{Response, XvcInfo, framing::ServerCodec};
//!
//! let mut framed = Framed::new(tcp, ServerCodec::new(1024));
//! while let Some(message) = framed.next().await {
//!     // ...
//!     framed.send(Response::Info(XvcInfo::default())).await?;
//! }
//! ```
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    codec::Parsed,
    error::ReadError,
    protocol::{Message, Response},
};

/// Decodes [Message]s sent by a client and encodes the [Response]s to them.
#[derive(Debug, Clone)]
pub struct ServerCodec {
    max_shift_bytes: usize,
}

impl ServerCodec {
    /// Creates a codec that rejects shift vectors longer than `max_shift_bytes`.
    pub fn new(max_shift_bytes: usize) -> ServerCodec {
        ServerCodec { max_shift_bytes }
    }

    /// Creates a codec that accepts shift vectors of any length.
    pub fn unbounded() -> ServerCodec {
        ServerCodec::new(usize::MAX)
    }
}

impl Decoder for ServerCodec {
    type Item = Message;
    type Error = ReadError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ReadError> {
        match Message::parse(&src[..], self.max_shift_bytes)? {
            Parsed::Complete { message, len } => {
                src.advance(len);
                Ok(Some(message))
            }
            Parsed::Incomplete { needed } => {
                src.reserve(needed.saturating_sub(src.len()));
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, ReadError> {
        match self.decode(buf)? {
            Some(message) => Ok(Some(message)),
            None if buf.is_empty() => Ok(None),
            None => Err(ReadError::Truncated {
                buffered: buf.len(),
            }),
        }
    }
}

impl Encoder<Response> for ServerCodec {
    type Error = ReadError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), ReadError> {
        let mut writer = dst.writer();
        item.write_to(&mut writer)?;
        Ok(())
    }
}
