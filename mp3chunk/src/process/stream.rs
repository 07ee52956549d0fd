use anyhow::{Result, anyhow, bail};
use log::Level::Warn;
use log::{debug, error, trace};

use crate::log_or_err;
use crate::process::frame::FrameDecoder;
use crate::process::source::DataSource;
use crate::process::window::{ChunkWindow, WindowConfig};
use crate::structs::format::StreamFormat;
use crate::utils::errors::StreamError;

/// Lifecycle of a [`StreamDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// The window is being repopulated. Only seen while construction or
    /// [`StreamDecoder::set_position`] runs.
    Priming,
    /// Frames may still be decoded.
    Streaming,
    /// The consumption cursor reached the end of the stream. Lasts until
    /// the next seek.
    Exhausted,
}

/// Decodes a compressed stream into fixed-size PCM bursts.
///
/// Owns a [`ChunkWindow`] over the data source and a [`FrameDecoder`]. Each
/// [`decode`](Self::decode) call decodes as many whole frames as fit in the
/// caller's buffer, shifting the window forward as frames are consumed.
///
/// PCM is written as interleaved native-endian 16-bit samples.
///
/// # Example
///
/// ```rust,no_run
/// use mp3chunk::process::frame::FrameDecoder;
/// use mp3chunk::process::source::SliceSource;
/// use mp3chunk::process::stream::StreamDecoder;
///
/// fn play<D: FrameDecoder>(mp3: Vec<u8>, decoder: D) -> anyhow::Result<()> {
///     let mut stream = StreamDecoder::new(SliceSource::new(mp3), decoder)?;
///     let mut burst = vec![0u8; 16384];
///
///     loop {
///         let written = stream.decode(&mut burst)?;
///         if written == 0 {
///             break;
///         }
///         println!("{written} bytes at {} Hz", stream.format().sample_rate);
///     }
///
///     // Jump back to the start
///     stream.set_position(0);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct StreamDecoder<S, D> {
    window: ChunkWindow<S>,
    decoder: D,
    consumption: usize,
    format: StreamFormat,
    state: StreamState,
    frame_pcm: Box<[i16]>,
    fail_level: log::Level,
}

impl<S: DataSource, D: FrameDecoder> StreamDecoder<S, D> {
    /// Creates a stream with the default 4 x 4096 byte window and primes it
    /// at offset 0.
    pub fn new(source: S, decoder: D) -> Result<Self> {
        Self::with_config(source, decoder, WindowConfig::default())
    }

    /// Creates a stream with a custom window geometry and primes it at
    /// offset 0.
    ///
    /// Fails when the lookahead cannot hold the decoder's largest frame.
    pub fn with_config(source: S, decoder: D, config: WindowConfig) -> Result<Self> {
        config.validate(decoder.max_frame_bytes())?;

        let mut stream = Self {
            window: ChunkWindow::new(source, config)?,
            frame_pcm: vec![0i16; decoder.max_frame_samples()].into_boxed_slice(),
            decoder,
            consumption: 0,
            format: StreamFormat::default(),
            state: StreamState::Priming,
            fail_level: log::Level::Error,
        };
        stream.set_position(0);

        Ok(stream)
    }

    /// Sets the failure level for stream conditions.
    ///
    /// - `log::Level::Error`: stalls are logged and absorbed (default)
    /// - `log::Level::Warn`: a stalled frame decoder fails the call
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    /// Smallest buffer [`decode`](Self::decode) accepts.
    pub fn min_buffer_len(&self) -> usize {
        self.frame_pcm.len() * 2
    }

    /// Fills `buffer` with PCM and returns the number of bytes written.
    ///
    /// Returns silence while the stream is resynchronising and 0 once it is
    /// exhausted. A buffer smaller than [`min_buffer_len`](Self::min_buffer_len)
    /// is an error.
    pub fn decode(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let frame_len = self.min_buffer_len();
        if buffer.len() < frame_len {
            let err = StreamError::BufferTooSmall {
                len: buffer.len(),
                required: frame_len,
            };
            error!("{err}");
            bail!(err);
        }

        if self.state == StreamState::Exhausted {
            return Ok(0);
        }

        let start = self.position();
        let mut written = 0;
        while buffer.len() - written >= frame_len {
            let bytes = self.decode_next_frame(&mut buffer[written..], written == 0)?;
            if bytes == 0 {
                break;
            }
            written += bytes;
        }

        let Some(eof) = self.window.end_of_stream() else {
            return Ok(if written == 0 {
                self.silence(buffer)
            } else {
                written
            });
        };

        let position = self.position();
        if position >= eof || (written == 0 && position == start) {
            self.set_state(StreamState::Exhausted);
        }

        if written == 0 && self.state != StreamState::Exhausted {
            return Ok(self.silence(buffer));
        }

        Ok(written)
    }

    /// Moves decoding to the absolute stream offset `position`.
    ///
    /// Discards the window, primes it at `position` and refreshes the format
    /// from the first frame found there. Produces no PCM.
    #[doc(alias = "seek")]
    pub fn set_position(&mut self, position: u64) {
        self.set_state(StreamState::Priming);

        self.consumption = 0;
        self.window.prime(position);

        let probe = self.decoder.decode_frame(self.window.view(0), None);
        if let Some(format) = probe.format {
            self.format = format;
        }

        match self.window.end_of_stream() {
            Some(eof) if position >= eof => self.set_state(StreamState::Exhausted),
            _ => self.set_state(StreamState::Streaming),
        }
    }

    /// Absolute offset of the next byte the frame decoder will see.
    ///
    /// The start of the buffered window plus the consumption cursor. Equal to
    /// `supply_position - window capacity + consumption` whenever every slot
    /// is full.
    pub fn position(&self) -> u64 {
        self.window.window_start() + self.consumption as u64
    }

    /// Format of the most recent frame. Channel count is at least 1.
    pub fn format(&self) -> StreamFormat {
        StreamFormat {
            channel_count: self.format.channels(),
            ..self.format
        }
    }

    /// Stream length once the data source has signalled its end.
    pub fn eof_position(&self) -> Option<u64> {
        self.window.end_of_stream()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn window(&self) -> &ChunkWindow<S> {
        &self.window
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn into_inner(self) -> (S, D) {
        (self.window.into_source(), self.decoder)
    }

    /// Decodes one frame into `out`, returning the bytes written.
    ///
    /// A stall is only reported when `first` is set. Later in a call it ends
    /// the call so the frames already written reach the caller.
    fn decode_next_frame(&mut self, out: &mut [u8], first: bool) -> Result<usize> {
        let lookback = self.window.config().lookback_bytes();
        while self.consumption >= lookback && self.window.end_of_stream().is_none() {
            self.window.shift();
            self.consumption -= lookback;
        }

        let data = self.window.view(self.consumption);
        let frame = self.decoder.decode_frame(data, Some(&mut self.frame_pcm[..]));
        let consumed = frame.consumed.min(data.len());

        self.consumption += consumed;
        if let Some(format) = frame.format {
            self.format = format;
        }

        trace!(
            "Frame at offset {}: {} samples, {consumed} bytes",
            self.position() - consumed as u64,
            frame.samples
        );

        if frame.samples == 0 {
            if first && consumed == 0 && self.window.end_of_stream().is_none() {
                log_or_err!(
                    self,
                    Warn,
                    anyhow!(StreamError::Stalled {
                        position: self.position()
                    })
                );
            }
            return Ok(0);
        }

        let count = (frame.samples * self.format.channels() as usize).min(self.frame_pcm.len());
        for (dst, sample) in out.chunks_exact_mut(2).zip(&self.frame_pcm[..count]) {
            dst.copy_from_slice(&sample.to_ne_bytes());
        }

        Ok(count * 2)
    }

    /// Zero-fills the block-aligned part of `buffer` and returns its length.
    fn silence(&self, buffer: &mut [u8]) -> usize {
        let block = self.format.bytes_for_samples(1);
        let len = buffer.len() - buffer.len() % block;

        debug!(
            "No frame decoded at offset {}, emitting {len} bytes of silence",
            self.position()
        );

        buffer[..len].fill(0);
        len
    }

    fn set_state(&mut self, state: StreamState) {
        if self.state != state {
            debug!("Stream state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}
