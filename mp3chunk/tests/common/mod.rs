#![allow(dead_code)]

use std::io;

use mp3chunk::process::frame::{DecodedFrame, FrameDecoder};
use mp3chunk::process::source::DataSource;
use mp3chunk::structs::format::StreamFormat;
use mp3chunk::structs::header::{FrameHeader, HEADER_BYTES, MAX_FRAME_BYTES, MAX_FRAME_SAMPLES};

/// MPEG-1 Layer III, 128 kbps, 48 kHz: 384 bytes, 1152 samples per channel.
pub const FRAME_BYTES: usize = 384;
pub const SAMPLES_PER_FRAME: usize = 1152;

const MONO_HEADER: [u8; 4] = [0xFF, 0xFB, 0x94, 0xC0];
const STEREO_HEADER: [u8; 4] = [0xFF, 0xFB, 0x94, 0x00];

fn frame(header: [u8; 4], index: usize) -> Vec<u8> {
    let mut frame = header.to_vec();
    // Payload stays below 0x80 so it never looks like a sync word
    frame.extend((0..FRAME_BYTES - HEADER_BYTES).map(|j| ((index * 31 + j * 7) % 128) as u8));
    frame
}

pub fn mono_frame(index: usize) -> Vec<u8> {
    frame(MONO_HEADER, index)
}

pub fn stereo_frame(index: usize) -> Vec<u8> {
    frame(STEREO_HEADER, index)
}

pub fn mono_stream(frames: usize) -> Vec<u8> {
    (0..frames).flat_map(mono_frame).collect()
}

/// Decoder that understands real MPEG headers and derives PCM from the
/// payload bytes, so identical frames always decode to identical samples.
#[derive(Debug, Default)]
pub struct SyntheticDecoder {
    pub calls: usize,
    pub largest_input: usize,
}

impl FrameDecoder for SyntheticDecoder {
    fn max_frame_bytes(&self) -> usize {
        MAX_FRAME_BYTES
    }

    fn max_frame_samples(&self) -> usize {
        MAX_FRAME_SAMPLES
    }

    fn decode_frame(&mut self, data: &[u8], pcm: Option<&mut [i16]>) -> DecodedFrame {
        self.calls += 1;
        self.largest_input = self.largest_input.max(data.len());

        let Some((offset, header)) = FrameHeader::find(data) else {
            // Keep a possible partial header for the next call
            return DecodedFrame {
                consumed: data.len().saturating_sub(HEADER_BYTES - 1),
                ..Default::default()
            };
        };

        let len = header.frame_bytes();
        if offset + len > data.len() {
            return DecodedFrame {
                consumed: offset,
                ..Default::default()
            };
        }

        let samples = header.samples_per_frame();
        if let Some(pcm) = pcm {
            let payload = &data[offset + HEADER_BYTES..offset + len];
            let count = samples * header.channels() as usize;
            for (i, sample) in pcm[..count].iter_mut().enumerate() {
                *sample = (payload[i % payload.len()] as i16 - 64) * 256 + i as i16 % 64;
            }
        }

        DecodedFrame {
            samples,
            consumed: offset + len,
            format: Some(StreamFormat::from(&header)),
        }
    }
}

/// Decoder that never finds anything and never advances.
#[derive(Debug, Default)]
pub struct StuckDecoder;

impl FrameDecoder for StuckDecoder {
    fn max_frame_bytes(&self) -> usize {
        MAX_FRAME_BYTES
    }

    fn max_frame_samples(&self) -> usize {
        MAX_FRAME_SAMPLES
    }

    fn decode_frame(&mut self, _data: &[u8], _pcm: Option<&mut [i16]>) -> DecodedFrame {
        DecodedFrame::default()
    }
}

/// Decodes `good` frames like [`SyntheticDecoder`], then stops making progress.
#[derive(Debug, Default)]
pub struct StallAfter {
    pub good: usize,
    inner: SyntheticDecoder,
}

impl StallAfter {
    pub fn new(good: usize) -> Self {
        Self {
            good,
            inner: SyntheticDecoder::default(),
        }
    }
}

impl FrameDecoder for StallAfter {
    fn max_frame_bytes(&self) -> usize {
        MAX_FRAME_BYTES
    }

    fn max_frame_samples(&self) -> usize {
        MAX_FRAME_SAMPLES
    }

    fn decode_frame(&mut self, data: &[u8], pcm: Option<&mut [i16]>) -> DecodedFrame {
        if pcm.is_some() {
            if self.good == 0 {
                return DecodedFrame::default();
            }
            self.good -= 1;
        }
        self.inner.decode_frame(data, pcm)
    }
}

/// PCM bytes the stream adapter should produce for `frame`.
pub fn frame_pcm(frame: &[u8]) -> Vec<u8> {
    let mut pcm = vec![0i16; MAX_FRAME_SAMPLES];
    let decoded = SyntheticDecoder::default().decode_frame(frame, Some(&mut pcm));
    let channels = decoded.format.map_or(1, |f| f.channels() as usize);

    pcm[..decoded.samples * channels]
        .iter()
        .flat_map(|s| s.to_ne_bytes())
        .collect()
}

/// Full-size reads of bytes that never contain a frame, forever.
#[derive(Debug, Default)]
pub struct GarbageSource;

impl DataSource for GarbageSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = ((offset as usize + i) % 0x7F) as u8;
        }
        Ok(buf.len())
    }
}

/// Endless well-formed mono stream.
#[derive(Debug, Default)]
pub struct EndlessSource;

impl DataSource for EndlessSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut offset = offset as usize;
        let mut filled = 0;

        while filled < buf.len() {
            let frame = mono_frame(offset / FRAME_BYTES);
            let start = offset % FRAME_BYTES;
            let count = (FRAME_BYTES - start).min(buf.len() - filled);

            buf[filled..filled + count].copy_from_slice(&frame[start..start + count]);
            filled += count;
            offset += count;
        }

        Ok(filled)
    }
}

/// Decodes until the stream reports 0 bytes, collecting every burst.
pub fn drain<S: DataSource, D: FrameDecoder>(
    stream: &mut mp3chunk::process::stream::StreamDecoder<S, D>,
    burst: usize,
) -> anyhow::Result<Vec<u8>> {
    let mut pcm = Vec::new();
    let mut buffer = vec![0u8; burst];

    loop {
        let written = stream.decode(&mut buffer)?;
        if written == 0 {
            return Ok(pcm);
        }
        pcm.extend_from_slice(&buffer[..written]);
    }
}
