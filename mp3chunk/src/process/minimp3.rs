//! [`FrameDecoder`] backed by the minimp3 C decoder.

use std::os::raw::c_int;

use ::minimp3::ffi;

use crate::process::frame::{DecodedFrame, FrameDecoder};
use crate::structs::format::StreamFormat;
use crate::structs::header::{MAX_FRAME_BYTES, MAX_FRAME_SAMPLES};

/// MPEG audio frame decoder using minimp3.
///
/// minimp3 resynchronises on its own: garbage before a frame is reported as
/// consumed, and an incomplete trailing frame is reported as "no frame".
pub struct Mp3FrameDecoder {
    decoder: Box<ffi::mp3dec_t>,
}

impl Mp3FrameDecoder {
    pub fn new() -> Self {
        // SAFETY: mp3dec_t is plain data and mp3dec_init fully initialises it.
        let mut decoder: Box<ffi::mp3dec_t> = Box::new(unsafe { std::mem::zeroed() });
        unsafe { ffi::mp3dec_init(&mut *decoder) };

        Self { decoder }
    }
}

impl Default for Mp3FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mp3FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mp3FrameDecoder").finish_non_exhaustive()
    }
}

impl FrameDecoder for Mp3FrameDecoder {
    fn max_frame_bytes(&self) -> usize {
        MAX_FRAME_BYTES
    }

    fn max_frame_samples(&self) -> usize {
        MAX_FRAME_SAMPLES
    }

    fn decode_frame(&mut self, data: &[u8], pcm: Option<&mut [i16]>) -> DecodedFrame {
        let pcm_ptr = match pcm {
            Some(pcm) if pcm.len() < MAX_FRAME_SAMPLES => {
                log::error!(
                    "PCM buffer holds {} samples, minimp3 needs {MAX_FRAME_SAMPLES}",
                    pcm.len()
                );
                return DecodedFrame::default();
            }
            Some(pcm) => pcm.as_mut_ptr(),
            None => std::ptr::null_mut(),
        };

        // SAFETY: zero is a valid bit pattern for the info struct.
        let mut info: ffi::mp3dec_frame_info_t = unsafe { std::mem::zeroed() };
        let len = data.len().min(c_int::MAX as usize) as c_int;

        // SAFETY: minimp3 reads at most `len` bytes from `data` and writes at
        // most MAX_FRAME_SAMPLES samples to a non-null `pcm_ptr`.
        let samples = unsafe {
            ffi::mp3dec_decode_frame(&mut *self.decoder, data.as_ptr(), len, pcm_ptr, &mut info)
        };

        let format = (info.hz > 0).then(|| StreamFormat {
            sample_rate: info.hz as u32,
            channel_count: info.channels.max(0) as u16,
            bitrate_kbps: info.bitrate_kbps.max(0) as u32,
        });

        DecodedFrame {
            samples: samples.max(0) as usize,
            consumed: info.frame_bytes.max(0) as usize,
            format,
        }
    }
}
