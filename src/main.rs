mod cli;
mod command;
mod error;
mod format;
mod probe;
mod runner;
mod selection;
mod tui;

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::RunError;
use crate::format::{NOT_AVAILABLE, format_bitrate, format_duration, format_size, parse_fps};
use crate::probe::MediaInfo;
use crate::runner::{RunOutcome, RunStatus, TranscodeRunner};
use crate::selection::SelectionSet;

fn main() -> Result<()> {
    let cfg = cli::Cli::parse().into_config()?;
    let tools = probe::resolve_tools(cfg.ffmpeg.clone(), cfg.ffprobe.clone())?;

    let info = probe::probe_media(&tools, &cfg.input)
        .with_context(|| format!("failed to probe {}", cfg.input.display()))?;
    print_media_summary(&info);

    if cfg.probe_only {
        return Ok(());
    }

    let mut selections = SelectionSet::for_streams(&info.streams);
    let mut spec = cfg.spec.clone();
    let mut output = cfg.output.clone();

    if cfg.interactive {
        output = tui::interactive_session(&info, &cfg.input, &mut selections, &mut spec)?;
    } else {
        for &idx in &cfg.drop_streams {
            selections.set_keep(idx, false);
        }
        for &idx in &cfg.reencode_audio {
            selections.set_audio_reencode(idx, true);
            selections.set_audio_codec(idx, &cfg.audio_codec);
            selections.set_audio_channels(idx, cfg.audio_channels);
            selections.set_audio_bitrate(idx, &cfg.audio_bitrate);
        }
    }

    let args =
        command::build_transcode_args(&info.streams, &selections, &spec, &cfg.input, &output)?;
    println!("ffmpeg {}", args.join(" "));

    let mut runner = TranscodeRunner::new();
    let cancel_handle = runner.handle();
    ctrlc::set_handler(move || cancel_handle.cancel()).context("failed to set Ctrl-C handler")?;

    runner
        .start(&tools, &cfg.input, args)
        .context("could not start ffmpeg")?;

    let handle = runner.handle();
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}]  [{bar:60.cyan/bright-black}] {pos:>3}%")
            .unwrap()
            .progress_chars("#>-"),
    );
    while handle.status() == RunStatus::Running {
        bar.set_position(handle.progress() as u64);
        thread::sleep(Duration::from_millis(200));
    }

    let result = runner.wait();
    if cfg.verbose {
        eprintln!("{}", handle.log());
    }
    match result {
        Ok(RunOutcome::Completed) => {
            bar.finish();
            println!("Conversion completed: {}", output.display());
            Ok(())
        }
        Ok(RunOutcome::Cancelled) => {
            bar.abandon();
            println!("Conversion cancelled by user.");
            Ok(())
        }
        Err(RunError::Failure { status, log }) => {
            bar.abandon();
            if !cfg.verbose {
                for line in tail_lines(&log, 12) {
                    eprintln!("{line}");
                }
            }
            anyhow::bail!("ffmpeg failed with {status}")
        }
        Err(err) => Err(err.into()),
    }
}

fn print_media_summary(info: &MediaInfo) {
    println!("Total File Size: {}", format_size(info.size));
    println!(
        "Total Duration: {}",
        format_duration(info.duration.as_deref())
    );
    println!(
        "Overall Bitrate: {}",
        format_bitrate(info.bit_rate.as_deref())
    );
    println!("{}", "-".repeat(50));

    for stream in &info.streams {
        println!("Stream #{} - {}", stream.index, stream.kind.label());
        println!(
            "  Codec: {}",
            stream.codec_name.as_deref().unwrap_or(NOT_AVAILABLE)
        );
        println!("  Language: {}", stream.language);
        println!(
            "  Duration: {}",
            format_duration(stream.duration.as_deref())
        );
        println!("  Bitrate: {}", format_bitrate(stream.bit_rate.as_deref()));
        if let Some(video) = &stream.video {
            let w = video
                .width
                .map_or(NOT_AVAILABLE.to_string(), |v| v.to_string());
            let h = video
                .height
                .map_or(NOT_AVAILABLE.to_string(), |v| v.to_string());
            println!("  Resolution: {w}x{h}");
            let fps = video
                .frame_rate
                .as_deref()
                .map_or(NOT_AVAILABLE.to_string(), |f| parse_fps(f).to_string());
            println!("  FPS: {fps}");
        }
    }
    println!();
}

fn tail_lines(log: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}
