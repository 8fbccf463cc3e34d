//! Message shapes.
//!
//! Outbound messages are what the harness sends; [`Payload`] is what the
//! transport hands back. Payloads are an explicit tagged union so the
//! dispatcher can match on them in a fixed order.

use std::fmt;
use std::sync::Arc;

/// A message queued for transmission as one discrete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::Binary(data.into())
    }

    /// Payload size in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// An inbound message as delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A native string.
    Text(String),
    /// A contiguous buffer owned by the payload.
    Binary(Vec<u8>),
    /// A window over a buffer shared with someone else.
    View(BufferView),
    /// Anything else, carried as an opaque rendering.
    Unknown(String),
}

impl From<OutboundMessage> for Payload {
    fn from(message: OutboundMessage) -> Self {
        match message {
            OutboundMessage::Text(text) => Self::Text(text),
            OutboundMessage::Binary(data) => Self::Binary(data),
        }
    }
}

/// A region `offset..offset + len` of a shared buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct BufferView {
    buffer: Arc<[u8]>,
    offset: usize,
    len: usize,
}

impl BufferView {
    /// Create a view, checking that the window fits inside the buffer.
    pub fn new(buffer: Arc<[u8]>, offset: usize, len: usize) -> Result<Self, PayloadError> {
        match offset.checked_add(len) {
            Some(end) if end <= buffer.len() => Ok(Self {
                buffer,
                offset,
                len,
            }),
            _ => Err(PayloadError::ViewOutOfBounds {
                offset,
                len,
                capacity: buffer.len(),
            }),
        }
    }

    /// A view covering the whole buffer.
    pub fn whole(buffer: Arc<[u8]>) -> Self {
        let len = buffer.len();
        Self {
            buffer,
            offset: 0,
            len,
        }
    }

    /// The bytes inside the window.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.len]
    }
}

impl fmt::Debug for BufferView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferView")
            .field("capacity", &self.buffer.len())
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

/// Error building a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("view {offset}+{len} exceeds buffer of {capacity} bytes")]
    ViewOutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_reads_its_window() {
        let buffer: Arc<[u8]> = Arc::from(&b"xxhelloyy"[..]);
        let view = BufferView::new(buffer, 2, 5).unwrap();
        assert_eq!(view.as_bytes(), b"hello");
    }

    #[test]
    fn view_rejects_window_past_end() {
        let buffer: Arc<[u8]> = Arc::from(&[0u8; 4][..]);
        let err = BufferView::new(buffer, 3, 2).unwrap_err();
        assert_eq!(
            err,
            PayloadError::ViewOutOfBounds {
                offset: 3,
                len: 2,
                capacity: 4
            }
        );
    }

    #[test]
    fn view_rejects_overflowing_offset() {
        let buffer: Arc<[u8]> = Arc::from(&[0u8; 4][..]);
        assert!(BufferView::new(buffer, usize::MAX, 1).is_err());
    }

    #[test]
    fn outbound_byte_len() {
        assert_eq!(OutboundMessage::text("abc").byte_len(), 3);
        assert_eq!(OutboundMessage::text("é").byte_len(), 2);
        assert_eq!(OutboundMessage::binary(vec![0; 10]).byte_len(), 10);
    }
}
