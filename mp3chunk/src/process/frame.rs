use crate::structs::format::StreamFormat;

/// Outcome of one [`FrameDecoder::decode_frame`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Samples produced per channel. Zero when no frame was decoded.
    pub samples: usize,

    /// Bytes of input consumed, including any garbage skipped before the
    /// frame. Zero together with zero samples means the input holds no
    /// complete frame yet.
    pub consumed: usize,

    /// Format of the frame that was found, if any.
    pub format: Option<StreamFormat>,
}

/// Decoder for single compressed frames.
///
/// The stream adapter hands each call the contiguous unread part of its
/// window. Implementations must not read past `data`. When `data` ends
/// before a complete frame they report zero samples and may consume only
/// the garbage in front of that frame.
pub trait FrameDecoder {
    /// Largest number of input bytes a single frame can occupy.
    fn max_frame_bytes(&self) -> usize;

    /// Largest number of interleaved samples a single frame decodes to.
    fn max_frame_samples(&self) -> usize;

    /// Decodes the first frame found in `data`.
    ///
    /// Interleaved 16-bit samples are written to `pcm`, which holds at least
    /// [`max_frame_samples`](FrameDecoder::max_frame_samples) entries. When
    /// `pcm` is `None` only the frame format is wanted.
    fn decode_frame(&mut self, data: &[u8], pcm: Option<&mut [i16]>) -> DecodedFrame;
}

impl<T: FrameDecoder + ?Sized> FrameDecoder for Box<T> {
    fn max_frame_bytes(&self) -> usize {
        (**self).max_frame_bytes()
    }

    fn max_frame_samples(&self) -> usize {
        (**self).max_frame_samples()
    }

    fn decode_frame(&mut self, data: &[u8], pcm: Option<&mut [i16]>) -> DecodedFrame {
        (**self).decode_frame(data, pcm)
    }
}
