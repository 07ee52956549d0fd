use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::command::{AudioFormat, Cli, DecodeArgs};
use crate::byteorder::WriteBytesLe;
use crate::timestamp::time_str;
use crate::wav::W64Writer;
use mp3chunk::process::frame::FrameDecoder;
use mp3chunk::process::source::{DataSource, ReaderSource};
use mp3chunk::process::stream::StreamDecoder;
use mp3chunk::structs::format::StreamFormat;

/// Consecutive calls without movement after which decoding is abandoned.
const MAX_STALLED_CALLS: u32 = 64;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    #[cfg(feature = "minimp3")]
    {
        let decoder = mp3chunk::process::minimp3::Mp3FrameDecoder::new();
        decode_file(decoder, args, cli, multi)
    }

    #[cfg(not(feature = "minimp3"))]
    {
        let _ = (args, cli, multi);
        bail!("mp3chunkd was built without the `minimp3` feature, decoding is unavailable")
    }
}

fn decode_file<D: FrameDecoder>(
    decoder: D,
    args: &DecodeArgs,
    cli: &Cli,
    multi: Option<&MultiProgress>,
) -> Result<()> {
    log::info!(
        "Decoding MPEG audio stream: {} (strict mode: {})",
        args.input.display(),
        cli.strict
    );

    let mut source = ReaderSource::new(File::open(&args.input)?);
    let total_bytes = source.stream_len()?;

    let mut stream = StreamDecoder::with_config(source, decoder, args.window.to_config())?;
    stream.set_fail_level(cli.fail_level());

    if let Some(start) = args.start {
        log::info!("Seeking to byte offset {start}");
        stream.set_position(start);
    }

    let base_path = args.output_path.as_deref().unwrap_or(&args.input);
    let audio_path = create_path_with_extension(base_path, args.format.extension());
    log::info!("Creating audio file: {}", audio_path.display());

    let format = stream.format();
    if format.sample_rate == 0 {
        log::warn!(
            "No frame found at offset {}, output format taken from the first decoded frame",
            stream.position()
        );
    } else {
        log::info!(
            "Output format: {} Hz, {} channels, 16 bit",
            format.sample_rate,
            format.channels()
        );
    }

    let mut writer = AudioWriter::create(File::create(&audio_path)?, args.format, format)?;

    let pb = match multi {
        Some(multi) => Some(create_progress_bar(multi, total_bytes)?),
        None => None,
    };

    let summary = match pump(&mut stream, &mut writer, args.burst, pb.as_ref()) {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(ref pb) = pb {
                pb.finish_with_message("decode failed");
            }
            return Err(e);
        }
    };
    writer.finish()?;

    if let Some(ref pb) = pb {
        pb.finish_with_message(format!(
            "speed: {:.1}x | timestamp: {}",
            summary.realtime_multiplier(),
            time_str(summary.audio_secs)
        ));
    }

    log::info!(
        "Decoding completed: {} bytes of PCM in {} calls ({} audio)",
        summary.pcm_bytes,
        summary.calls,
        time_str(summary.audio_secs)
    );
    if summary.format_changes > 0 {
        log::warn!(
            "Stream format changed {} times, output header describes the first format",
            summary.format_changes
        );
    }

    Ok(())
}

#[derive(Debug, Default)]
struct DecodeSummary {
    calls: u64,
    pcm_bytes: u64,
    audio_secs: f64,
    format_changes: u32,
    elapsed_secs: f64,
}

impl DecodeSummary {
    fn realtime_multiplier(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.audio_secs / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Pulls fixed-size bursts from `stream` into `writer` until the stream is
/// exhausted.
fn pump<S: DataSource, D: FrameDecoder, W: Write + Seek>(
    stream: &mut StreamDecoder<S, D>,
    writer: &mut AudioWriter<W>,
    burst: usize,
    pb: Option<&ProgressBar>,
) -> Result<DecodeSummary> {
    let start_time = std::time::Instant::now();
    let mut summary = DecodeSummary::default();
    let mut buffer = vec![0u8; burst];
    let mut format = stream.format();
    let mut last_position = stream.position();
    let mut stalled_calls = 0;

    loop {
        let written = stream.decode(&mut buffer)?;
        if written == 0 {
            break;
        }

        let current = stream.format();
        if format.sample_rate == 0 && current.sample_rate > 0 {
            log::info!(
                "Output format: {} Hz, {} channels, 16 bit",
                current.sample_rate,
                current.channels()
            );
            writer.set_format(current);
            format = current;
        } else if current != format {
            log::warn!(
                "Stream format changed at offset {}: {} Hz {} ch -> {} Hz {} ch",
                stream.position(),
                format.sample_rate,
                format.channels(),
                current.sample_rate,
                current.channels()
            );
            format = current;
            summary.format_changes += 1;
        }

        if stream.position() == last_position {
            stalled_calls += 1;
            if stalled_calls >= MAX_STALLED_CALLS {
                bail!(
                    "No progress at stream offset {} after {stalled_calls} calls",
                    last_position
                );
            }
        } else {
            stalled_calls = 0;
            last_position = stream.position();
        }

        writer.write_pcm(&buffer[..written])?;

        summary.calls += 1;
        summary.pcm_bytes += written as u64;
        if format.sample_rate > 0 {
            let frames = written / format.bytes_for_samples(1);
            summary.audio_secs += frames as f64 / format.sample_rate as f64;
        }

        if let Some(pb) = pb {
            pb.set_position(stream.position());
            if summary.calls.is_multiple_of(30) {
                let elapsed = start_time.elapsed().as_secs_f64();
                let realtime_multiplier = summary.audio_secs / elapsed.max(f64::EPSILON);
                pb.set_message(format!(
                    "speed: {realtime_multiplier:.1}x | timestamp: {}",
                    time_str(summary.audio_secs)
                ));
            }
        }
    }

    summary.elapsed_secs = start_time.elapsed().as_secs_f64();
    Ok(summary)
}

fn create_progress_bar(multi: &MultiProgress, total_bytes: u64) -> Result<ProgressBar> {
    let pb = multi.add(ProgressBar::new(total_bytes));
    pb.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {bytes}/{total_bytes} ({percent}%)\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}",
    )?);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("initializing decoder");
    Ok(pb)
}

fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    match base_path.extension() {
        Some(ext) if ext == expected_ext => base_path.to_path_buf(),
        Some(_) => {
            let mut name = base_path.as_os_str().to_owned();
            name.push(".");
            name.push(expected_ext);
            PathBuf::from(name)
        }
        None => base_path.with_extension(expected_ext),
    }
}

enum AudioWriter<W: Write + Seek> {
    Pcm(BufWriter<W>),
    W64(W64Writer<W>),
}

impl<W: Write + Seek> AudioWriter<W> {
    fn create(inner: W, format: AudioFormat, stream: StreamFormat) -> Result<Self> {
        Ok(match format {
            AudioFormat::Pcm => AudioWriter::Pcm(BufWriter::new(inner)),
            AudioFormat::W64 => {
                let mut writer = W64Writer::new(inner, stream.sample_rate, stream.channels());
                writer.write_header()?;
                AudioWriter::W64(writer)
            }
        })
    }

    /// Writes native-endian stream PCM as little-endian samples.
    fn write_pcm(&mut self, pcm: &[u8]) -> Result<()> {
        let mut le = Vec::with_capacity(pcm.len());
        for sample in pcm.chunks_exact(2) {
            i16::from_ne_bytes([sample[0], sample[1]]).write_le(&mut le);
        }

        match self {
            AudioWriter::Pcm(pcm_writer) => pcm_writer.write_all(&le)?,
            AudioWriter::W64(w64_writer) => w64_writer.write_pcm(&le)?,
        }
        Ok(())
    }

    /// Sets the format recorded in the file header. Raw PCM has none.
    fn set_format(&mut self, stream: StreamFormat) {
        if let AudioWriter::W64(w64_writer) = self {
            w64_writer.set_format(stream.sample_rate, stream.channels());
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            AudioWriter::Pcm(pcm_writer) => pcm_writer.flush()?,
            AudioWriter::W64(w64_writer) => w64_writer.finish()?,
        }
        Ok(())
    }
}
