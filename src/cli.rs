use anyhow::{Result, bail};
use clap::{ArgAction, Parser, ValueHint};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::command::{Container, OutputSpec, PRESETS, VIDEO_CODECS};
use crate::selection::{
    AUDIO_CHANNELS, AUDIO_CODECS, DEFAULT_AUDIO_BITRATE, DEFAULT_AUDIO_CODEC,
    DEFAULT_AUDIO_CHANNELS,
};

#[derive(Parser, Debug)]
#[command(
    name = "video_converter",
    version,
    about = "Inspect a media file's streams and convert it with ffmpeg"
)]
pub struct Cli {
    /// Input media file
    #[arg(short = 'i', long, value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output file (default: <input>_converted.<container>)
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Output container format
    #[arg(long, value_enum, default_value_t = Container::Mp4)]
    pub container: Container,

    /// Video codec (libx264, libx265, libvpx-vp9, libaom-av1, copy)
    #[arg(long, default_value = "copy", value_parser = validate_video_codec)]
    pub video_codec: String,

    /// Target resolution WIDTHxHEIGHT (e.g. 1280x720); omit to keep source
    #[arg(long, value_parser = parse_resolution)]
    pub resolution: Option<(u32, u32)>,

    /// Pixel format (yuv420p, yuv420p10le, yuv420p12le); omit to keep source
    #[arg(long)]
    pub pix_fmt: Option<String>,

    /// Encoder preset (ultrafast..placebo); omit for the encoder default
    #[arg(long, value_parser = validate_preset)]
    pub preset: Option<String>,

    /// Drop a stream by its original index (repeatable)
    #[arg(long = "drop", value_name = "INDEX")]
    pub drop_streams: Vec<u32>,

    /// Re-encode an audio stream by its original index (repeatable)
    #[arg(long = "reencode-audio", value_name = "INDEX")]
    pub reencode_audio: Vec<u32>,

    /// Audio codec for re-encoded streams
    #[arg(long, default_value = DEFAULT_AUDIO_CODEC, value_parser = validate_audio_codec)]
    pub audio_codec: String,

    /// Channel count for re-encoded streams (1, 2 or 6)
    #[arg(long, default_value_t = DEFAULT_AUDIO_CHANNELS, value_parser = validate_audio_channels)]
    pub audio_channels: u8,

    /// Bitrate for re-encoded audio streams (e.g. 128k)
    #[arg(long, default_value = DEFAULT_AUDIO_BITRATE)]
    pub audio_bitrate: String,

    /// Pick streams and output options interactively
    #[arg(long, action = ArgAction::SetTrue)]
    pub interactive: bool,

    /// Probe and print stream info, then exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub probe_only: bool,

    /// Show the retained ffmpeg log after the run
    #[arg(long, action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Path to ffmpeg binary (overrides PATH lookup)
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to ffprobe binary (overrides PATH lookup)
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub spec: OutputSpec,
    pub drop_streams: Vec<u32>,
    pub reencode_audio: Vec<u32>,
    pub audio_codec: String,
    pub audio_channels: u8,
    pub audio_bitrate: String,
    pub interactive: bool,
    pub probe_only: bool,
    pub verbose: bool,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> Result<AppConfig> {
        if !self.input.exists() {
            bail!("Input not found: {}", self.input.display());
        }
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| default_output(&self.input, self.container));

        Ok(AppConfig {
            input: self.input,
            output,
            spec: OutputSpec {
                container: self.container,
                video_codec: self.video_codec,
                resolution: self.resolution,
                pix_fmt: self.pix_fmt,
                preset: self.preset,
            },
            drop_streams: self.drop_streams,
            reencode_audio: self.reencode_audio,
            audio_codec: self.audio_codec,
            audio_channels: self.audio_channels,
            audio_bitrate: self.audio_bitrate,
            interactive: self.interactive,
            probe_only: self.probe_only,
            verbose: self.verbose,
            ffmpeg: self.ffmpeg,
            ffprobe: self.ffprobe,
        })
    }
}

pub fn default_output(input: &Path, container: Container) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("output");
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_converted.{}", container.as_str()))
}

fn validate_video_codec(raw: &str) -> Result<String, String> {
    if VIDEO_CODECS.contains(&raw) {
        Ok(raw.to_string())
    } else {
        Err(format!(
            "unknown video codec (expected one of {VIDEO_CODECS:?})"
        ))
    }
}

fn validate_preset(raw: &str) -> Result<String, String> {
    if PRESETS.contains(&raw) {
        Ok(raw.to_string())
    } else {
        Err(format!("unknown preset (expected one of {PRESETS:?})"))
    }
}

fn validate_audio_codec(raw: &str) -> Result<String, String> {
    if AUDIO_CODECS.contains(&raw) {
        Ok(raw.to_string())
    } else {
        Err(format!(
            "unknown audio codec (expected one of {AUDIO_CODECS:?})"
        ))
    }
}

fn validate_audio_channels(raw: &str) -> Result<u8, String> {
    let parsed: u8 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a channel count"))?;
    if AUDIO_CHANNELS.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("channel count must be one of {AUDIO_CHANNELS:?}"))
    }
}

fn parse_resolution(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', ':'])
        .ok_or_else(|| format!("`{raw}` must look like 1280x720"))?;
    let w: u32 = w.parse().map_err(|_| format!("bad width in `{raw}`"))?;
    let h: u32 = h.parse().map_err(|_| format!("bad height in `{raw}`"))?;
    if w == 0 || h == 0 {
        return Err("resolution must be non-zero".into());
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_next_to_input() {
        let out = default_output(Path::new("/videos/movie.mkv"), Container::Mp4);
        assert_eq!(out, PathBuf::from("/videos/movie_converted.mp4"));

        let out = default_output(Path::new("clip.ts"), Container::Webm);
        assert_eq!(out, PathBuf::from("clip_converted.webm"));
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_resolution("1920:1080"), Ok((1920, 1080)));
        assert!(parse_resolution("720p").is_err());
        assert!(parse_resolution("0x720").is_err());
    }

    #[test]
    fn test_codec_validation() {
        assert!(validate_video_codec("libx264").is_ok());
        assert!(validate_video_codec("copy").is_ok());
        assert!(validate_video_codec("h264").is_err());

        assert!(validate_audio_codec("libopus").is_ok());
        assert!(validate_audio_codec("wav").is_err());
    }

    #[test]
    fn test_preset_validation() {
        assert!(validate_preset("veryslow").is_ok());
        assert!(validate_preset("default").is_err());
    }

    #[test]
    fn test_channel_validation() {
        assert_eq!(validate_audio_channels("2"), Ok(2));
        assert_eq!(validate_audio_channels("6"), Ok(6));
        assert!(validate_audio_channels("4").is_err());
        assert!(validate_audio_channels("stereo").is_err());
    }
}
