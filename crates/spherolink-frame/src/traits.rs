use bytes::{Bytes, BytesMut};

use crate::codec::{decode_response, encode_command, CommandFrame, FrameConfig, ResponseFrame};
use crate::error::Result;

/// A frame that can be written to the wire.
pub trait Encode {
    /// Append the wire bytes of this frame to `dst`.
    fn encode(&self, dst: &mut BytesMut) -> Result<()>;

    /// Number of bytes [`Encode::encode`] will append.
    fn wire_len(&self) -> usize;
}

/// A frame that can be built from a received chunk.
pub trait Decode: Sized {
    fn decode(src: &[u8], config: &FrameConfig) -> Result<Self>;
}

/// Undecoded bytes, exactly as received or as they will be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(pub Bytes);

impl RawFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Encode for CommandFrame {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_command(
            self.device_id,
            self.command_id,
            self.seq,
            &self.payload,
            self.flags,
            dst,
        )
    }

    fn wire_len(&self) -> usize {
        CommandFrame::wire_len(self)
    }
}

impl Decode for ResponseFrame {
    fn decode(src: &[u8], config: &FrameConfig) -> Result<Self> {
        decode_response(src, config)
    }
}

impl Encode for RawFrame {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&self.0);
        Ok(())
    }

    fn wire_len(&self) -> usize {
        self.0.len()
    }
}

impl Decode for RawFrame {
    fn decode(src: &[u8], _config: &FrameConfig) -> Result<Self> {
        Ok(Self(Bytes::copy_from_slice(src)))
    }
}
