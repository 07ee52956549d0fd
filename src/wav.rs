use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use mp3chunkd_macros::ToBytes;

use crate::byteorder::WriteBytesLe;

// W64 GUIDs as defined in Sony Wave64 specification
pub const W64_RIFF_GUID: [u8; 16] = [
    0x72, 0x69, 0x66, 0x66, 0x2E, 0x91, 0xCF, 0x11, 0xA5, 0xD6, 0x28, 0xDB, 0x04, 0xC1, 0x00, 0x00,
];
pub const W64_WAVE_GUID: [u8; 16] = [
    0x77, 0x61, 0x76, 0x65, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_FMT_GUID: [u8; 16] = [
    0x66, 0x6D, 0x74, 0x20, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_DATA_GUID: [u8; 16] = [
    0x64, 0x61, 0x74, 0x61, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];

/// GUID plus a 64-bit size that counts the chunk header itself.
const CHUNK_HEADER_BYTES: u64 = 24;

/// Offset of the RIFF size field.
const RIFF_SIZE_OFFSET: u64 = 16;

/// Offset of the fmt chunk body.
const FMT_OFFSET: u64 = 40 + CHUNK_HEADER_BYTES;

/// Offset of the data chunk size field.
const DATA_SIZE_OFFSET: u64 = 40 + CHUNK_HEADER_BYTES + 16 + 16;

#[derive(ToBytes)]
struct ChunkHeader {
    guid: [u8; 16],
    size: u64,
}

#[derive(ToBytes)]
struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

/// Sony Wave64 writer for interleaved 16-bit PCM (.w64 extension)
pub struct W64Writer<W: Write + Seek> {
    writer: BufWriter<W>,
    data_written: u64,
    sample_rate: u32,
    channels: u16,
}

impl<W: Write + Seek> W64Writer<W> {
    pub fn new(writer: W, sample_rate: u32, channels: u16) -> Self {
        Self {
            writer: BufWriter::new(writer),
            data_written: 0,
            sample_rate,
            channels,
        }
    }

    fn fmt_chunk(&self) -> FmtChunk {
        let block_align = self.channels * 2;
        FmtChunk {
            format_tag: 1,
            channels: self.channels,
            sample_rate: self.sample_rate,
            byte_rate: self.sample_rate * block_align as u32,
            block_align,
            bits_per_sample: 16,
        }
    }

    /// Replace the format written by [`finish`](Self::finish).
    pub fn set_format(&mut self, sample_rate: u32, channels: u16) {
        self.sample_rate = sample_rate;
        self.channels = channels;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Write the header with placeholder sizes.
    pub fn write_header(&mut self) -> io::Result<()> {
        let fmt = self.fmt_chunk();

        let mut header = Vec::new();
        ChunkHeader {
            guid: W64_RIFF_GUID,
            size: 0,
        }
        .write_le(&mut header);
        W64_WAVE_GUID.write_le(&mut header);
        ChunkHeader {
            guid: W64_FMT_GUID,
            size: CHUNK_HEADER_BYTES + 16,
        }
        .write_le(&mut header);
        fmt.write_le(&mut header);
        ChunkHeader {
            guid: W64_DATA_GUID,
            size: 0,
        }
        .write_le(&mut header);

        self.writer.write_all(&header)
    }

    /// Append interleaved little-endian PCM bytes.
    pub fn write_pcm(&mut self, pcm: &[u8]) -> io::Result<()> {
        self.writer.write_all(pcm)?;
        self.data_written += pcm.len() as u64;
        Ok(())
    }

    /// Patch the fmt chunk, the RIFF size and the data size.
    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;

        let end = self.writer.stream_position()?;

        // Data chunks are padded to 8 bytes
        let pad = (8 - self.data_written % 8) % 8;
        if pad > 0 {
            self.writer.write_all(&[0u8; 8][..pad as usize])?;
        }
        let file_size = end + pad;

        let mut fmt = Vec::new();
        self.fmt_chunk().write_le(&mut fmt);
        self.writer.seek(SeekFrom::Start(FMT_OFFSET))?;
        self.writer.write_all(&fmt)?;

        self.writer.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.writer
            .write_all(&(self.data_written + CHUNK_HEADER_BYTES).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.writer.write_all(&file_size.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(file_size))?;
        self.writer.flush()
    }

    pub fn data_written(&self) -> u64 {
        self.data_written
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}
