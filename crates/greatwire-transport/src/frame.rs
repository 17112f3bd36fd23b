use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Command header: class number (4) + verb number (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Largest command frame (header and payload) a device accepts, and the
/// largest response it will return.
pub const MAX_COMMAND_SIZE: usize = 4096;

/// Size of the error number returned by a cancel transaction.
pub const ERRNO_SIZE: usize = 4;

bitflags::bitflags! {
    /// Flags carried alongside a command transfer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandFlags: u16 {
        /// The host will not read a response.
        const SKIP_RESPONSE = 1 << 0;
        /// Re-execute the previously sent frame instead of a new one.
        const REPEAT_LAST = 1 << 1;
    }
}

/// A command addressed to one verb of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub class: u32,
    pub verb: u32,
    pub payload: Bytes,
}

impl CommandFrame {
    pub fn new(class: u32, verb: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            class,
            verb,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode the frame into its wire format.
    ///
    /// ```text
    /// ┌──────────────┬──────────────┬──────────────────┐
    /// │ Class (4B LE)│ Verb (4B LE) │ Payload          │
    /// └──────────────┴──────────────┴──────────────────┘
    /// ```
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        dst.put_u32_le(self.class);
        dst.put_u32_le(self.verb);
        dst.put_slice(&self.payload);
        dst.freeze()
    }

    /// Parse a frame as received by a device. Returns `None` if the header
    /// is incomplete.
    pub fn decode(mut src: &[u8]) -> Option<Self> {
        if src.len() < HEADER_SIZE {
            return None;
        }
        let class = src.get_u32_le();
        let verb = src.get_u32_le();
        Some(Self {
            class,
            verb,
            payload: Bytes::copy_from_slice(src),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_little_endian() {
        let frame = CommandFrame::new(0x0102, 7, vec![0xAA]);
        assert_eq!(
            frame.encode().as_ref(),
            &[0x02, 0x01, 0, 0, 7, 0, 0, 0, 0xAA]
        );
        assert_eq!(frame.wire_size(), 9);
    }

    #[test]
    fn decode_reverses_encode() {
        let frame = CommandFrame::new(0x10, 3, Bytes::from_static(b"abc"));
        assert_eq!(CommandFrame::decode(&frame.encode()), Some(frame));
    }

    #[test]
    fn short_header_is_rejected() {
        assert_eq!(CommandFrame::decode(&[0; 7]), None);
        let empty = CommandFrame::decode(&[0; 8]).unwrap();
        assert!(empty.payload.is_empty());
    }

    #[test]
    fn flag_bits_match_the_wire() {
        assert_eq!(CommandFlags::SKIP_RESPONSE.bits(), 1);
        assert_eq!(CommandFlags::REPEAT_LAST.bits(), 2);
        assert!(CommandFlags::default().is_empty());
    }
}
