use std::fmt;
use std::path::Path;

use clap::ValueEnum;

use crate::error::CommandError;
use crate::probe::{StreamDescriptor, StreamKind};
use crate::selection::SelectionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Container {
    Mp4,
    Mkv,
    Webm,
}

impl Container {
    pub fn as_str(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "mkv",
            Container::Webm => "webm",
        }
    }

    /// Conservative blacklist per container; pairs not listed are allowed.
    fn rejected_codecs(self) -> &'static [&'static str] {
        match self {
            Container::Mp4 => &["libvpx-vp9", "libaom-av1"],
            Container::Webm => &["libx264", "libx265", "ac3"],
            Container::Mkv => &[],
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const VIDEO_CODECS: &[&str] = &["libx264", "libx265", "libvpx-vp9", "libaom-av1", "copy"];

pub const PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

pub const PIX_FMTS: &[&str] = &["yuv420p", "yuv420p10le", "yuv420p12le"];

pub const RESOLUTIONS: &[(&str, u32, u32)] = &[
    ("144p", 256, 144),
    ("240p", 426, 240),
    ("360p", 640, 360),
    ("480p (SD)", 854, 480),
    ("540p", 960, 540),
    ("720p (HD)", 1280, 720),
    ("900p (HD+)", 1600, 900),
    ("1080p (FHD)", 1920, 1080),
    ("1440p (2K)", 2560, 1440),
    ("2160p (4K)", 3840, 2160),
];

/// Global output choices; `None` means "same as source".
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub container: Container,
    pub video_codec: String,
    pub resolution: Option<(u32, u32)>,
    pub pix_fmt: Option<String>,
    pub preset: Option<String>,
}

/// Translate selections plus the output spec into an ffmpeg argument list.
///
/// Pure given its inputs: no filesystem access, no process spawned, same
/// selections always yield the same list. The destination path comes last.
pub fn build_transcode_args(
    streams: &[StreamDescriptor],
    selections: &SelectionSet,
    spec: &OutputSpec,
    input: &Path,
    output: &Path,
) -> Result<Vec<String>, CommandError> {
    if spec
        .container
        .rejected_codecs()
        .contains(&spec.video_codec.as_str())
    {
        return Err(CommandError::IncompatibleOptions {
            codec: spec.video_codec.clone(),
            container: spec.container.as_str(),
        });
    }

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
    ];

    // Output audio streams renumber from zero, independent of the
    // original indices, so the codec directives use their own counter.
    let mut audio_out = 0usize;
    for stream in streams {
        if !selections.is_kept(stream.index) {
            continue;
        }
        args.push("-map".into());
        args.push(format!("0:{}", stream.index));

        if stream.kind == StreamKind::Audio {
            match selections.get(stream.index).and_then(|s| s.audio.as_ref()) {
                Some(audio) if audio.reencode => {
                    args.push(format!("-c:a:{audio_out}"));
                    args.push(audio.codec.clone());
                    args.push(format!("-b:a:{audio_out}"));
                    args.push(audio.bitrate.clone());
                    args.push(format!("-ac:{audio_out}"));
                    args.push(audio.channels.to_string());
                }
                _ => {
                    args.push(format!("-c:a:{audio_out}"));
                    args.push("copy".into());
                }
            }
            audio_out += 1;
        }
    }

    args.push("-c:v".into());
    args.push(spec.video_codec.clone());

    if spec.video_codec != "copy" {
        if let Some(fmt) = &spec.pix_fmt {
            args.push("-pix_fmt".into());
            args.push(fmt.clone());
        }
        if let Some(preset) = spec.preset.as_deref().filter(|p| PRESETS.contains(p)) {
            args.push("-preset".into());
            args.push(preset.to_string());
        }
        if let Some((w, h)) = spec.resolution {
            args.push("-vf".into());
            args.push(format!("scale={w}:{h}"));
        }
    }

    args.push("-c:s".into());
    args.push("copy".into());
    args.push(output.to_string_lossy().into_owned());
    Ok(args)
}
