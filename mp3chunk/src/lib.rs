//! Streaming MPEG audio decoding through a fixed-capacity chunk window.
//!
//! ## Technical Overview
//!
//! A host supplies compressed data through random-access pulls of bounded
//! size and asks for PCM in fixed-size bursts, seeking to arbitrary byte
//! offsets at any time.
//!
//! ### Chunk Window
//!
//! A single allocation split into equal slots (4 x 4096 bytes by default).
//! The first half is decoded from while the second half is read ahead. Once
//! the decoder moves past the first half, the read-ahead slots move down and
//! the tail is refilled from the source. A short read from the source marks
//! the end of the stream.
//!
//! ### Stream Adapter
//!
//! Drives a frame decoder over the contiguous window contents, tracks the
//! consumption cursor, emits silence while resynchronising after a seek and
//! reports 0 bytes once the stream is exhausted.
//!
//! ## Quick Start
//!
//! 1. Wrap the compressed bytes in a [`process::source::DataSource`]
//! 2. Pick a [`process::frame::FrameDecoder`] (the `minimp3` feature provides one)
//! 3. Pull PCM with [`process::stream::StreamDecoder::decode`]
//!
//! ```rust,no_run
//! use mp3chunk::process::frame::FrameDecoder;
//! use mp3chunk::process::source::ReaderSource;
//! use mp3chunk::process::stream::StreamDecoder;
//!
//! fn first_burst<D: FrameDecoder>(decoder: D) -> anyhow::Result<Vec<u8>> {
//!     let file = std::fs::File::open("stream.mp3")?;
//!     let mut stream = StreamDecoder::new(ReaderSource::new(file), decoder)?;
//!
//!     let mut pcm = vec![0u8; 16384];
//!     let written = stream.decode(&mut pcm)?;
//!     pcm.truncate(written);
//!
//!     let format = stream.format();
//!     println!(
//!         "{} Hz, {} channels, {} kbps",
//!         format.sample_rate,
//!         format.channels(),
//!         format.bitrate_kbps
//!     );
//!     Ok(pcm)
//! }
//! ```

/// Processing pipeline for compressed streams.
///
/// 1. **Sources** ([`process::source`]): random-access byte providers.
///
/// 2. **Window** ([`process::window`]): fixed-capacity slot buffer with
///    shift-and-refill.
///
/// 3. **Stream** ([`process::stream`]): frame-by-frame decoding into PCM
///    bursts with seek and end-of-stream handling.
pub mod process;

/// Data structures describing MPEG audio streams.
///
/// - **Frame Headers** ([`structs::header`]): sync, bitrate, sample rate, frame length
/// - **Stream Format** ([`structs::format`]): the format reported to consumers
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
