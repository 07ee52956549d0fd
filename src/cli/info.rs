use std::fs::File;

use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use super::command::{Cli, InfoArgs, ReportFormat};
use crate::timestamp::time_str;
use mp3chunk::process::source::{CountingSource, DataSource, ReaderSource};
use mp3chunk::process::window::ChunkWindow;
use mp3chunk::structs::header::{FrameHeader, HEADER_BYTES, MAX_FRAME_BYTES};

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing MPEG audio stream: {}", args.input.display());

    let config = args.window.to_config();
    config.validate(MAX_FRAME_BYTES)?;

    let source = CountingSource::new(ReaderSource::new(File::open(&args.input)?));
    let mut window = ChunkWindow::new(source, config)?;

    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb.set_message("Analyzing frames...");
            Some(pb)
        }
        None => None,
    };

    let report = scan_stream(&mut window, pb.as_ref())?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if cli.strict && report.truncated_bytes > 0 {
        bail!(
            "Stream ends with a truncated frame ({} bytes)",
            report.truncated_bytes
        );
    }

    let stats = window.source().stats();
    log::debug!(
        "{} reads, {} bytes requested, {} bytes returned",
        stats.reads,
        stats.bytes_requested,
        stats.bytes_returned
    );

    match args.report {
        ReportFormat::Text => display_report(&report),
        ReportFormat::Yaml => print!("{}", serde_yaml_ng::to_string(&report)?),
    }

    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct StreamReport {
    size_bytes: u64,
    frames: u64,
    first_frame_offset: Option<u64>,
    first_format: Option<FrameSummary>,
    min_bitrate_kbps: u32,
    max_bitrate_kbps: u32,
    average_bitrate_kbps: f64,
    duration_secs: f64,
    skipped_bytes: u64,
    truncated_bytes: u64,
    channel_changes: Vec<ChannelChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct FrameSummary {
    version: String,
    layer: String,
    sample_rate: u32,
    channels: u16,
    mode: String,
    crc_protected: bool,
}

impl From<&FrameHeader> for FrameSummary {
    fn from(header: &FrameHeader) -> Self {
        Self {
            version: header.version.to_string(),
            layer: header.layer.to_string(),
            sample_rate: header.sample_rate,
            channels: header.channels(),
            mode: header.mode.to_string(),
            crc_protected: header.crc_protected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ChannelChange {
    offset: u64,
    frame: u64,
    channels: u16,
}

/// Walks every frame header reachable through `window`.
///
/// Uses the same shift-and-refill discipline as the stream decoder: the
/// cursor never leaves the lookback slots while more data may follow, so
/// a whole frame is always buffered ahead of it.
fn scan_stream<S: DataSource>(
    window: &mut ChunkWindow<S>,
    pb: Option<&ProgressBar>,
) -> Result<StreamReport> {
    let lookback = window.config().lookback_bytes();
    let mut report = StreamReport::default();
    let mut cursor = 0usize;
    let mut total_bits = 0f64;
    let mut channels = None;

    window.prime(0);

    loop {
        while cursor >= lookback && window.end_of_stream().is_none() {
            window.shift();
            cursor -= lookback;
        }

        let data = window.view(cursor);
        let offset = window.window_start() + cursor as u64;

        let Some((skip, header)) = FrameHeader::find(data) else {
            if window.end_of_stream().is_some() {
                report.skipped_bytes += data.len() as u64;
                break;
            }
            // Keep a possible partial header
            let skip = data.len().saturating_sub(HEADER_BYTES - 1);
            report.skipped_bytes += skip as u64;
            cursor += skip;
            continue;
        };

        let len = header.frame_bytes();
        if skip + len > data.len() {
            if window.end_of_stream().is_some() {
                report.skipped_bytes += skip as u64;
                report.truncated_bytes += (data.len() - skip) as u64;
                log::warn!(
                    "Truncated frame at offset {}: {} of {len} bytes",
                    offset + skip as u64,
                    data.len() - skip
                );
                break;
            }
            report.skipped_bytes += skip as u64;
            cursor += skip;
            continue;
        }

        if skip > 0 {
            log::debug!("Skipped {skip} bytes before frame at offset {offset}");
        }

        let frame_offset = offset + skip as u64;
        if report.first_format.is_none() {
            report.first_frame_offset = Some(frame_offset);
            report.first_format = Some(FrameSummary::from(&header));
            report.min_bitrate_kbps = header.bitrate_kbps;
        }

        if channels.is_some_and(|c| c != header.channels()) {
            report.channel_changes.push(ChannelChange {
                offset: frame_offset,
                frame: report.frames,
                channels: header.channels(),
            });
        }
        channels = Some(header.channels());

        report.frames += 1;
        report.skipped_bytes += skip as u64;
        report.min_bitrate_kbps = report.min_bitrate_kbps.min(header.bitrate_kbps);
        report.max_bitrate_kbps = report.max_bitrate_kbps.max(header.bitrate_kbps);
        report.duration_secs += header.duration_secs();
        total_bits += len as f64 * 8.0;
        cursor += skip + len;

        if report.frames.is_multiple_of(1000) {
            if let Some(pb) = pb {
                pb.set_message(format!("Analyzing frames...       {}", report.frames));
                pb.tick();
            }
        }
    }

    report.size_bytes = window.end_of_stream().unwrap_or_default();
    if report.duration_secs > 0.0 {
        report.average_bitrate_kbps = total_bits / report.duration_secs / 1000.0;
    }

    Ok(report)
}

fn display_report(report: &StreamReport) {
    println!();
    println!("MPEG Audio Stream Information");
    println!("=============================");
    println!();

    let Some(format) = &report.first_format else {
        println!("No MPEG audio frame found in the file.");
        println!();
        return;
    };

    println!("Stream Information");
    println!("  Format                    {} {}", format.version, format.layer);
    println!("  Sampling rate             {} Hz", format.sample_rate);
    println!("  Channels                  {} ({})", format.channels, format.mode);
    println!("  CRC protected             {}", format.crc_protected);
    if report.min_bitrate_kbps == report.max_bitrate_kbps {
        println!("  Bitrate                   {} kbps", report.max_bitrate_kbps);
    } else {
        println!(
            "  Bitrate                   {}-{} kbps (variable)",
            report.min_bitrate_kbps, report.max_bitrate_kbps
        );
    }
    println!();

    if !report.channel_changes.is_empty() {
        println!("Channel Changes");
        for change in &report.channel_changes {
            println!(
                "  Frame {:<10}          {} channels at offset {}",
                change.frame, change.channels, change.offset
            );
        }
        println!();
    }

    println!("Analysis Summary");
    println!("  Frames processed          {}", report.frames);

    let size_mb = report.size_bytes as f64 / 1_000_000.0;
    println!(
        "  Size                      {size_mb:.2} MB ({} bytes)",
        report.size_bytes
    );
    if let Some(offset) = report.first_frame_offset {
        println!("  First frame offset        {offset}");
    }
    println!("  Skipped bytes             {}", report.skipped_bytes);
    if report.truncated_bytes > 0 {
        println!("  Truncated tail            {} bytes", report.truncated_bytes);
    }
    println!("  Duration                  {}", time_str(report.duration_secs));
    println!(
        "  Average data rate         {:.1} kbps",
        report.average_bitrate_kbps
    );
    println!();
}
