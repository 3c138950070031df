use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::response::ResponseCode;

/// Start-of-packet byte that opens every frame in both directions.
pub const SOP1: u8 = 0xFF;

/// Base value of the command flags byte (`0b1111_11RA`).
pub const SOP2_BASE: u8 = 0xFC;
/// Flag bit: the device should answer the command.
pub const FLAG_ANSWER: u8 = 0x01;
/// Flag bit: the command resets the device's client inactivity timeout.
pub const FLAG_RESET_TIMEOUT: u8 = 0x02;

/// Response marker for a synchronous answer.
pub const SOP2_SYNC: u8 = 0xFF;
/// Response marker for an asynchronous (unsolicited) message.
pub const SOP2_ASYNC: u8 = 0xFE;

/// Command header: SOP1, SOP2, DID, CID, SEQ, DLEN.
pub const COMMAND_HEADER_SIZE: usize = 6;
/// Response header: SOP1, SOP2, MRSP, SEQ, DLEN.
pub const RESPONSE_HEADER_SIZE: usize = 5;
/// Largest payload a one-byte length field can describe.
pub const MAX_PAYLOAD: usize = 255;

/// Flags carried in the second byte of a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFlags {
    /// Ask the device for a synchronous response.
    pub answer: bool,
    /// Reset the device's inactivity timeout.
    pub reset_timeout: bool,
}

impl CommandFlags {
    /// Fire-and-forget command: no answer, timeout reset.
    pub const ASYNC: Self = Self {
        answer: false,
        reset_timeout: true,
    };

    /// The SOP2 byte for these flags.
    pub fn to_sop2(self) -> u8 {
        let mut sop2 = SOP2_BASE;
        if self.reset_timeout {
            sop2 |= FLAG_RESET_TIMEOUT;
        }
        if self.answer {
            sop2 |= FLAG_ANSWER;
        }
        sop2
    }

    /// Recover flags from a SOP2 byte.
    pub fn from_sop2(sop2: u8) -> Self {
        Self {
            answer: sop2 & FLAG_ANSWER != 0,
            reset_timeout: sop2 & FLAG_RESET_TIMEOUT != 0,
        }
    }
}

impl Default for CommandFlags {
    /// Answer requested, no forced timeout reset.
    fn default() -> Self {
        Self {
            answer: true,
            reset_timeout: false,
        }
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone, Default)]
pub struct FrameConfig {
    /// Verify the trailing checksum of inbound frames. Default: off, the
    /// transport's own integrity checks are trusted.
    pub validate_checksum: bool,
}

/// One's-complement of the modulo-256 sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Checksum of a command frame.
///
/// Sums DID, CID, SEQ, the on-wire length byte (payload length + 1, since the
/// device counts the checksum byte) and every payload byte, then inverts.
pub fn command_checksum(device_id: u8, command_id: u8, seq: u8, payload: &[u8]) -> u8 {
    let dlen = (payload.len() as u8).wrapping_add(1);
    let header = device_id
        .wrapping_add(command_id)
        .wrapping_add(seq)
        .wrapping_add(dlen);
    !payload
        .iter()
        .fold(header, |acc, b| acc.wrapping_add(*b))
}

/// Encode a command into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬───────┬─────┬─────┬─────┬──────────┬──────────────┬─────┐
/// │ 0xFF │ flags │ DID │ CID │ SEQ │ len + 1  │ payload      │ CHK │
/// └──────┴───────┴─────┴─────┴─────┴──────────┴──────────────┴─────┘
/// ```
pub fn encode_command(
    device_id: u8,
    command_id: u8,
    seq: u8,
    payload: &[u8],
    flags: CommandFlags,
    dst: &mut BytesMut,
) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(COMMAND_HEADER_SIZE + payload.len() + 1);
    dst.put_u8(SOP1);
    dst.put_u8(flags.to_sop2());
    dst.put_u8(device_id);
    dst.put_u8(command_id);
    dst.put_u8(seq);
    dst.put_u8((payload.len() as u8).wrapping_add(1));
    dst.put_slice(payload);
    dst.put_u8(command_checksum(device_id, command_id, seq, payload));
    Ok(())
}

/// Decode a response from the start of `src`.
///
/// Header fields are read at fixed offsets, then exactly `data_length` payload
/// bytes are copied. A buffer that ends early reads as zeros past its end,
/// like the zero-filled receive buffer it came from. The checksum is only
/// enforced when [`FrameConfig::validate_checksum`] is set.
pub fn decode_response(src: &[u8], config: &FrameConfig) -> Result<ResponseFrame> {
    if src.len() < RESPONSE_HEADER_SIZE {
        return Err(FrameError::MalformedFrame {
            needed: RESPONSE_HEADER_SIZE,
            available: src.len(),
        });
    }

    let sop2 = src[1];
    let code = src[2];
    let seq = src[3];
    let data_length = src[4];

    let len = usize::from(data_length);
    let body = &src[RESPONSE_HEADER_SIZE..];
    let mut payload = BytesMut::zeroed(len);
    let available = body.len().min(len);
    payload[..available].copy_from_slice(&body[..available]);

    let checksum_byte = body.get(len).copied();
    let frame = ResponseFrame {
        sop2,
        code,
        seq,
        data_length,
        payload: payload.freeze(),
        checksum: checksum_byte,
    };

    if config.validate_checksum {
        let actual = checksum_byte.ok_or(FrameError::MalformedFrame {
            needed: frame.wire_len(),
            available: src.len(),
        })?;
        let expected = frame.computed_checksum();
        if actual != expected {
            return Err(FrameError::ChecksumMismatch { expected, actual });
        }
    }

    Ok(frame)
}

/// Skip leading noise in a received chunk.
///
/// Returns the chunk starting at the first [`SOP1`] byte, or `None` if the
/// chunk holds no start marker at all.
pub fn align_to_marker(chunk: &[u8]) -> Option<&[u8]> {
    chunk
        .iter()
        .position(|&b| b == SOP1)
        .map(|offset| &chunk[offset..])
}

/// An outbound command packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub flags: CommandFlags,
    pub device_id: u8,
    pub command_id: u8,
    pub seq: u8,
    pub payload: Bytes,
}

impl CommandFrame {
    /// Create a command with default flags and no payload.
    pub fn new(device_id: u8, command_id: u8, seq: u8) -> Self {
        Self {
            flags: CommandFlags::default(),
            device_id,
            command_id,
            seq,
            payload: Bytes::new(),
        }
    }

    /// Attach a payload. Size is checked when the frame is encoded.
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Override the flags byte.
    pub fn with_flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Checksum this frame carries on the wire.
    pub fn checksum(&self) -> u8 {
        command_checksum(self.device_id, self.command_id, self.seq, &self.payload)
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_len(&self) -> usize {
        COMMAND_HEADER_SIZE + self.payload.len() + 1
    }
}

/// An inbound response packet with its header fields decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Sync (`0xFF`) or async (`0xFE`) indicator.
    pub sop2: u8,
    /// Raw message response code.
    pub code: u8,
    /// Echoed sequence number, or 0 for async messages.
    pub seq: u8,
    /// Declared payload length.
    pub data_length: u8,
    /// Exactly `data_length` bytes.
    pub payload: Bytes,
    /// Trailing checksum byte, when the buffer contained one.
    pub checksum: Option<u8>,
}

impl ResponseFrame {
    /// Typed response code.
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from(self.code)
    }

    /// Whether the device sent this frame unsolicited.
    pub fn is_async(&self) -> bool {
        self.sop2 == SOP2_ASYNC
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_len(&self) -> usize {
        RESPONSE_HEADER_SIZE + usize::from(self.data_length) + 1
    }

    /// Checksum the device should have sent for these fields.
    pub fn computed_checksum(&self) -> u8 {
        let header = self
            .code
            .wrapping_add(self.seq)
            .wrapping_add(self.data_length);
        !self
            .payload
            .iter()
            .fold(header, |acc, b| acc.wrapping_add(*b))
    }

    /// Read a big-endian integer from the payload starting at `start`.
    ///
    /// Bytes are accumulated one at a time: each of the first `N - 1`
    /// available bytes is OR'd in and shifted left by 8, and the last byte is
    /// OR'd without a shift if it is still inside `data_length`. A read that
    /// runs off the end therefore leaves zero low-order bytes, and
    /// `start >= data_length` yields 0.
    pub fn data_to<T: PayloadInt>(&self, start: usize) -> T {
        let len = usize::from(self.data_length);
        let mut index = start;
        let mut value = 0u64;

        let mut taken = 0;
        while index < len && taken < T::WIDTH - 1 {
            value |= u64::from(self.payload[index]);
            value <<= 8;
            index += 1;
            taken += 1;
        }
        if index < len {
            value |= u64::from(self.payload[index]);
        }

        T::from_accumulated(value)
    }

    /// Read `len` payload bytes starting at `start` as a string, one char per byte.
    ///
    /// `len` is clamped to what remains of `data_length` (`None` means all of
    /// it); a `start` past `data_length` yields an empty string.
    pub fn data_string(&self, start: usize, len: Option<usize>) -> String {
        let data_length = usize::from(self.data_length);
        if start > data_length {
            return String::new();
        }
        let len = len.unwrap_or(usize::MAX).min(data_length - start);
        self.payload[start..start + len]
            .iter()
            .map(|&b| char::from(b))
            .collect()
    }
}

/// Integer types [`ResponseFrame::data_to`] can produce.
pub trait PayloadInt: Copy {
    /// Width in bytes.
    const WIDTH: usize;

    /// Truncate an accumulated big-endian value to this type.
    fn from_accumulated(value: u64) -> Self;
}

macro_rules! impl_payload_int {
    ($($ty:ty => $unsigned:ty),* $(,)?) => {
        $(
            impl PayloadInt for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn from_accumulated(value: u64) -> Self {
                    value as $unsigned as $ty
                }
            }
        )*
    };
}

impl_payload_int!(
    u8 => u8,
    u16 => u16,
    u32 => u32,
    u64 => u64,
    i8 => u8,
    i16 => u16,
    i32 => u32,
    i64 => u64,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn response(bytes: &[u8]) -> ResponseFrame {
        decode_response(bytes, &FrameConfig::default()).unwrap()
    }

    #[test]
    fn test_checksum_reference_vector() {
        // 0x00 + 0x01 + 0x52 + 0x02 + 0xFF = 0x154 -> 0x54 -> !0x54 = 0xAB
        assert_eq!(command_checksum(0x00, 0x01, 0x52, &[0xFF]), 0xAB);
    }

    #[test]
    fn test_encode_command_layout() {
        let mut buf = BytesMut::new();
        encode_command(0x00, 0x01, 0x52, &[0xFF], CommandFlags::default(), &mut buf).unwrap();

        assert_eq!(buf.as_ref(), &[0xFF, 0xFD, 0x00, 0x01, 0x52, 0x02, 0xFF, 0xAB]);
        assert_eq!(buf.len(), COMMAND_HEADER_SIZE + 1 + 1);
    }

    #[test]
    fn test_encode_ping_without_payload() {
        let mut buf = BytesMut::new();
        let flags = CommandFlags {
            answer: true,
            reset_timeout: true,
        };
        encode_command(0x00, 0x01, 0x52, &[], flags, &mut buf).unwrap();

        // 0x00 + 0x01 + 0x52 + 0x01 = 0x54 -> 0xAB
        assert_eq!(buf.as_ref(), &[0xFF, 0xFF, 0x00, 0x01, 0x52, 0x01, 0xAB]);
    }

    #[test]
    fn test_encoded_checksum_matches_fields() {
        for payload_len in [0usize, 1, 2, 17, 128, 254, 255] {
            let payload: Vec<u8> = (0..payload_len).map(|i| (i * 7) as u8).collect();
            let mut buf = BytesMut::new();
            encode_command(0x02, 0x30, 0xC8, &payload, CommandFlags::default(), &mut buf)
                .unwrap();

            assert_eq!(buf.len(), 7 + payload_len);
            let trailer = buf[buf.len() - 1];
            assert_eq!(trailer, checksum(&buf[2..buf.len() - 1]));
            assert_eq!(trailer, command_checksum(0x02, 0x30, 0xC8, &payload));
        }
    }

    #[test]
    fn test_payload_too_large() {
        let mut buf = BytesMut::new();
        let payload = vec![0u8; 256];
        let err = encode_command(0, 1, 0, &payload, CommandFlags::default(), &mut buf).unwrap_err();
        assert_eq!(err, FrameError::PayloadTooLarge { size: 256, max: 255 });
        assert!(buf.is_empty());
    }

    #[test]
    fn test_flags_byte() {
        assert_eq!(CommandFlags::default().to_sop2(), 0xFD);
        assert_eq!(CommandFlags::ASYNC.to_sop2(), 0xFE);
        let none = CommandFlags {
            answer: false,
            reset_timeout: false,
        };
        assert_eq!(none.to_sop2(), 0xFC);
        assert_eq!(
            CommandFlags::from_sop2(0xFF),
            CommandFlags {
                answer: true,
                reset_timeout: true
            }
        );
    }

    #[test]
    fn test_decode_plain_response() {
        let frame = response(&[0xFF, 0xFF, 0x00, 0x01, 0x01, 0xFF]);

        assert_eq!(frame.sop2, 0xFF);
        assert_eq!(frame.response_code(), ResponseCode::Ok);
        assert_eq!(frame.seq, 0x01);
        assert_eq!(frame.data_length, 0x01);
        assert_eq!(frame.payload.as_ref(), &[0xFF]);
        assert_eq!(frame.checksum, None);
        assert_eq!(frame.wire_len(), 6 + 1);
        assert!(!frame.is_async());
    }

    #[test]
    fn test_decode_error_response() {
        let frame = response(&[0xFF, 0xFF, 0x09, 0x01, 0x01, 0xFF]);
        assert_eq!(frame.response_code(), ResponseCode::BadDeviceId);
        assert_eq!(frame.response_code().description(), "Unknown Device ID");
    }

    #[test]
    fn test_decode_short_header() {
        let err = decode_response(&[0xFF, 0xFF, 0x00, 0x01], &FrameConfig::default()).unwrap_err();
        assert_eq!(
            err,
            FrameError::MalformedFrame {
                needed: 5,
                available: 4
            }
        );
    }

    #[test]
    fn test_decode_short_payload_reads_zeros() {
        let frame = response(&[0xFF, 0xFF, 0x00, 0x01, 0x04, 0xAA]);
        assert_eq!(frame.payload.as_ref(), &[0xAA, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_ignores_bad_checksum_by_default() {
        let frame = response(&[0xFF, 0xFF, 0x00, 0x07, 0x01, 0x10, 0x00]);
        assert_eq!(frame.checksum, Some(0x00));
        assert_ne!(frame.computed_checksum(), 0x00);
    }

    #[test]
    fn test_decode_validates_checksum_when_enabled() {
        let config = FrameConfig {
            validate_checksum: true,
        };
        // 0x00 + 0x07 + 0x01 + 0x10 = 0x18 -> 0xE7
        let good = decode_response(&[0xFF, 0xFF, 0x00, 0x07, 0x01, 0x10, 0xE7], &config).unwrap();
        assert_eq!(good.checksum, Some(0xE7));

        let bad = decode_response(&[0xFF, 0xFF, 0x00, 0x07, 0x01, 0x10, 0x00], &config)
            .unwrap_err();
        assert_eq!(
            bad,
            FrameError::ChecksumMismatch {
                expected: 0xE7,
                actual: 0x00
            }
        );

        let missing = decode_response(&[0xFF, 0xFF, 0x00, 0x07, 0x01, 0x10], &config).unwrap_err();
        assert!(matches!(missing, FrameError::MalformedFrame { needed: 7, available: 6 }));
    }

    #[test]
    fn test_data_to_u16() {
        let only_two = response(&[0xFF, 0xFF, 0x00, 0x01, 0x02, 0x27, 0x10]);
        assert_eq!(only_two.data_to::<u16>(0), 10000);

        let last_two = response(&[
            0xFF, 0xFF, 0x00, 0x01, 0x09, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0xC3, 0x50,
        ]);
        assert_eq!(last_two.data_to::<u16>(7), 50000);

        let middle = response(&[0xFF, 0xFF, 0x00, 0x01, 0x04, 0x01, 0x7F, 0xFF, 0x04]);
        assert_eq!(middle.data_to::<u16>(1), 0x7FFF);

        let all_ones = response(&[0xFF, 0xFF, 0x00, 0x01, 0x02, 0xFF, 0xFF]);
        assert_eq!(all_ones.data_to::<u16>(0), 0xFFFF);

        let one_byte = response(&[0xFF, 0xFF, 0x00, 0x01, 0x01, 0xF0]);
        assert_eq!(one_byte.data_to::<u16>(0), 0xF000);
    }

    #[test]
    fn test_data_to_out_of_range_is_zero() {
        let frame = response(&[0xFF, 0xFF, 0x00, 0x01, 0x02, 0x27, 0x10]);
        assert_eq!(frame.data_to::<u16>(2), 0);
        assert_eq!(frame.data_to::<u32>(200), 0);

        let empty = response(&[0xFF, 0xFF, 0x00, 0x64, 0x00]);
        assert_eq!(empty.data_to::<u16>(0), 0);
    }

    #[test]
    fn test_data_to_other_widths() {
        let frame = response(&[0xFF, 0xFF, 0x00, 0x01, 0x05, 0x12, 0x34, 0x56, 0x78, 0x9A]);
        assert_eq!(frame.data_to::<u8>(4), 0x9A);
        assert_eq!(frame.data_to::<u32>(0), 0x1234_5678);
        assert_eq!(frame.data_to::<u32>(2), 0x5678_9A00);
        assert_eq!(frame.data_to::<u64>(0), 0x1234_5678_9A00);

        let negative = response(&[0xFF, 0xFF, 0x00, 0x01, 0x02, 0xFF, 0x38]);
        assert_eq!(negative.data_to::<i16>(0), -200);
    }

    #[test]
    fn test_data_string() {
        let frame = response(&[0xFF, 0xFF, 0x00, 0x01, 0x06, b'S', b'p', b'h', b'e', b'r', b'o']);
        assert_eq!(frame.data_string(0, None), "Sphero");
        assert_eq!(frame.data_string(0, Some(3)), "Sph");
        assert_eq!(frame.data_string(3, Some(100)), "ero");
        assert_eq!(frame.data_string(6, None), "");
        assert_eq!(frame.data_string(7, None), "");
    }

    #[test]
    fn test_align_to_marker() {
        assert_eq!(
            align_to_marker(&[0x00, 0x12, 0xFF, 0xFF, 0x00]),
            Some(&[0xFF, 0xFF, 0x00][..])
        );
        assert_eq!(align_to_marker(&[0xFF, 0x01]), Some(&[0xFF, 0x01][..]));
        assert_eq!(align_to_marker(&[0x00, 0x01]), None);
        assert_eq!(align_to_marker(&[]), None);
    }

    #[test]
    fn test_command_frame_builder() {
        let frame = CommandFrame::new(0x02, 0x20, 9)
            .with_payload(vec![0xFF, 0x00, 0x00, 0x01])
            .with_flags(CommandFlags::ASYNC);
        assert_eq!(frame.wire_len(), 11);
        assert_eq!(frame.flags.to_sop2(), 0xFE);
        assert_eq!(frame.checksum(), command_checksum(0x02, 0x20, 9, &[0xFF, 0x00, 0x00, 0x01]));
    }
}
