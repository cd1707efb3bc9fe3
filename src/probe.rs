use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use which::which;

use crate::error::ProbeError;

#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

pub fn resolve_tools(ffmpeg: Option<PathBuf>, ffprobe: Option<PathBuf>) -> Result<Tools> {
    Ok(Tools {
        ffmpeg: resolve_bin(ffmpeg, "ffmpeg")?,
        ffprobe: resolve_bin(ffprobe, "ffprobe")?,
    })
}

fn resolve_bin(bin_opt: Option<PathBuf>, default: &str) -> Result<PathBuf> {
    if let Some(path) = bin_opt {
        if path.is_file() {
            return Ok(path);
        }
        bail!("Provided binary not found: {}", path.display());
    }

    which(default)
        .or_else(|_| {
            if cfg!(windows) {
                let exe = format!("{default}.exe");
                which(&exe)
            } else {
                Err(which::Error::CannotFindBinaryPath)
            }
        })
        .with_context(|| format!("`{default}` not found in PATH"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl StreamKind {
    fn from_codec_type(raw: Option<&str>) -> Self {
        match raw {
            Some("video") => StreamKind::Video,
            Some("audio") => StreamKind::Audio,
            Some("subtitle") => StreamKind::Subtitle,
            _ => StreamKind::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StreamKind::Video => "Video",
            StreamKind::Audio => "Audio",
            StreamKind::Subtitle => "Subtitle",
            StreamKind::Other => "Other",
        }
    }
}

/// Video-only fields; absent values stay `None` and render as "N/A".
#[derive(Debug, Clone)]
pub struct VideoParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<String>,
}

/// One physical stream of the probed file. Immutable once probed.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    pub index: u32,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
    pub language: String,
    pub duration: Option<String>,
    pub bit_rate: Option<String>,
    pub video: Option<VideoParams>,
}

/// Container-level metadata plus the stream list of the most recent probe.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub duration: Option<String>,
    pub bit_rate: Option<String>,
    pub size: Option<u64>,
    pub streams: Vec<StreamDescriptor>,
}

pub fn probe_media(tools: &Tools, input: &Path) -> Result<MediaInfo, ProbeError> {
    let out = Command::new(&tools.ffprobe)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(input)
        .output()
        .map_err(ProbeError::Spawn)?;
    if !out.status.success() {
        return Err(ProbeError::Failed { status: out.status });
    }
    let raw: FfprobeOutput = serde_json::from_slice(&out.stdout)?;
    let size = fs::metadata(input).ok().map(|m| m.len());
    Ok(media_info_from(raw, size))
}

/// Duration-only probe, used as the progress denominator before a run.
pub fn probe_duration_seconds(tools: &Tools, input: &Path) -> Result<f64, ProbeError> {
    let out = Command::new(&tools.ffprobe)
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(input)
        .output()
        .map_err(ProbeError::Spawn)?;
    if !out.status.success() {
        return Err(ProbeError::Failed { status: out.status });
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    s.parse::<f64>().map_err(|_| ProbeError::Duration(s))
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FormatSection,
    #[serde(default)]
    streams: Vec<StreamSection>,
}

#[derive(Debug, Default, Deserialize)]
struct FormatSection {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamSection {
    index: Option<u32>,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: StreamTags,
}

#[derive(Debug, Default, Deserialize)]
struct StreamTags {
    language: Option<String>,
    #[serde(rename = "BPS")]
    bps: Option<String>,
}

fn media_info_from(raw: FfprobeOutput, size: Option<u64>) -> MediaInfo {
    let container_duration = raw.format.duration.clone();
    let streams = raw
        .streams
        .into_iter()
        .enumerate()
        .map(|(pos, s)| {
            let kind = StreamKind::from_codec_type(s.codec_type.as_deref());
            let video = (kind == StreamKind::Video).then(|| VideoParams {
                width: s.width,
                height: s.height,
                frame_rate: s.avg_frame_rate.clone(),
            });
            StreamDescriptor {
                index: s.index.unwrap_or(pos as u32),
                kind,
                codec_name: s.codec_name,
                language: s.tags.language.unwrap_or_else(|| "und".to_string()),
                // Per-stream duration falls back to the container's.
                duration: s.duration.or_else(|| container_duration.clone()),
                // Matroska commonly carries the rate in tags.BPS instead.
                bit_rate: s.bit_rate.or(s.tags.bps),
                video,
            }
        })
        .collect();

    MediaInfo {
        duration: raw.format.duration,
        bit_rate: raw.format.bit_rate,
        size,
        streams,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "avg_frame_rate": "30000/1001",
                "bit_rate": "4500000"
            },
            {
                "index": 1,
                "codec_type": "audio",
                "codec_name": "aac",
                "tags": { "language": "eng", "BPS": "128000" }
            },
            {
                "index": 2,
                "codec_type": "subtitle",
                "codec_name": "subrip"
            }
        ],
        "format": { "duration": "90.5", "bit_rate": "5000000" }
    }"#;

    fn parse(json: &str) -> MediaInfo {
        let raw: FfprobeOutput = serde_json::from_str(json).unwrap();
        media_info_from(raw, Some(1024))
    }

    #[test]
    fn test_parses_streams_and_format() {
        let info = parse(SAMPLE);
        assert_eq!(info.duration.as_deref(), Some("90.5"));
        assert_eq!(info.bit_rate.as_deref(), Some("5000000"));
        assert_eq!(info.size, Some(1024));
        assert_eq!(info.streams.len(), 3);

        let video = &info.streams[0];
        assert_eq!(video.kind, StreamKind::Video);
        let params = video.video.as_ref().unwrap();
        assert_eq!(params.width, Some(1920));
        assert_eq!(params.frame_rate.as_deref(), Some("30000/1001"));

        let audio = &info.streams[1];
        assert_eq!(audio.kind, StreamKind::Audio);
        assert_eq!(audio.language, "eng");
        assert!(audio.video.is_none());
    }

    #[test]
    fn test_stream_duration_falls_back_to_container() {
        let info = parse(SAMPLE);
        assert_eq!(info.streams[1].duration.as_deref(), Some("90.5"));
    }

    #[test]
    fn test_bit_rate_falls_back_to_bps_tag() {
        let info = parse(SAMPLE);
        assert_eq!(info.streams[1].bit_rate.as_deref(), Some("128000"));
    }

    #[test]
    fn test_missing_fields_become_none() {
        let info = parse(r#"{"streams": [{}], "format": {}}"#);
        let s = &info.streams[0];
        assert_eq!(s.index, 0);
        assert_eq!(s.kind, StreamKind::Other);
        assert!(s.codec_name.is_none());
        assert_eq!(s.language, "und");
        assert!(s.duration.is_none());
        assert!(s.bit_rate.is_none());
    }

    #[test]
    fn test_empty_document() {
        let info = parse("{}");
        assert!(info.streams.is_empty());
        assert!(info.duration.is_none());
    }
}
