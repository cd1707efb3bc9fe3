use anyhow::Result;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::path::{Path, PathBuf};

use crate::cli::default_output;
use crate::command::{Container, OutputSpec, PRESETS, PIX_FMTS, RESOLUTIONS};
use crate::format::{NOT_AVAILABLE, format_bitrate, format_duration, parse_fps};
use crate::probe::{MediaInfo, StreamKind};
use crate::selection::{AUDIO_BITRATES, AUDIO_CHANNELS, AUDIO_CODECS, SelectionSet};

const VIDEO_CODEC_CHOICES: &[(&str, &str)] = &[
    ("H.264", "libx264"),
    ("HEVC (H.265)", "libx265"),
    ("VP9", "libvpx-vp9"),
    ("AV1", "libaom-av1"),
    ("Copy", "copy"),
];

const PIX_FMT_LABELS: &[&str] = &["8-bit", "10-bit", "12-bit"];

/// Walk the user through per-stream and global choices, mutating the
/// selections and spec in place. Returns the output path to write to.
pub fn interactive_session(
    info: &MediaInfo,
    input: &Path,
    selections: &mut SelectionSet,
    spec: &mut OutputSpec,
) -> Result<PathBuf> {
    let theme = ColorfulTheme::default();

    println!("Streams:");
    for stream in &info.streams {
        let codec = stream.codec_name.as_deref().unwrap_or(NOT_AVAILABLE);
        let mut line = format!(
            "  #{} {} codec={} lang={} duration={} bitrate={}",
            stream.index,
            stream.kind.label(),
            codec,
            stream.language,
            format_duration(stream.duration.as_deref()),
            format_bitrate(stream.bit_rate.as_deref()),
        );
        if let Some(video) = &stream.video {
            let w = video.width.map_or(NOT_AVAILABLE.to_string(), |w| w.to_string());
            let h = video.height.map_or(NOT_AVAILABLE.to_string(), |h| h.to_string());
            let fps = video
                .frame_rate
                .as_deref()
                .map_or(NOT_AVAILABLE.to_string(), |f| parse_fps(f).to_string());
            line.push_str(&format!(" {w}x{h} fps={fps}"));
        }
        println!("{line}");
    }
    println!();

    for stream in &info.streams {
        let prompt = format!("Keep stream #{} ({})?", stream.index, stream.kind.label());
        let keep = Confirm::with_theme(&theme)
            .with_prompt(prompt)
            .default(true)
            .interact()?;
        selections.set_keep(stream.index, keep);

        if keep && stream.kind == StreamKind::Audio {
            let reencode = Confirm::with_theme(&theme)
                .with_prompt(format!("Re-encode audio stream #{}?", stream.index))
                .default(false)
                .interact()?;
            selections.set_audio_reencode(stream.index, reencode);

            if reencode {
                let codec = Select::with_theme(&theme)
                    .with_prompt("Audio codec")
                    .items(AUDIO_CODECS)
                    .default(0)
                    .interact()?;
                selections.set_audio_codec(stream.index, AUDIO_CODECS[codec]);

                let channel_labels: Vec<String> =
                    AUDIO_CHANNELS.iter().map(|c| c.to_string()).collect();
                let channels = Select::with_theme(&theme)
                    .with_prompt("Channels")
                    .items(&channel_labels)
                    .default(1)
                    .interact()?;
                selections.set_audio_channels(stream.index, AUDIO_CHANNELS[channels]);

                let bitrate = Select::with_theme(&theme)
                    .with_prompt("Bitrate")
                    .items(AUDIO_BITRATES)
                    .default(1)
                    .interact()?;
                selections.set_audio_bitrate(stream.index, AUDIO_BITRATES[bitrate]);
            }
        }
    }

    let containers = [Container::Mp4, Container::Mkv, Container::Webm];
    let container_labels: Vec<&str> = containers.iter().map(|c| c.as_str()).collect();
    let current = containers
        .iter()
        .position(|c| *c == spec.container)
        .unwrap_or(0);
    let picked = Select::with_theme(&theme)
        .with_prompt("Convert to")
        .items(&container_labels)
        .default(current)
        .interact()?;
    spec.container = containers[picked];

    let codec_labels: Vec<&str> = VIDEO_CODEC_CHOICES.iter().map(|(l, _)| *l).collect();
    let current = VIDEO_CODEC_CHOICES
        .iter()
        .position(|(_, v)| *v == spec.video_codec)
        .unwrap_or(0);
    let picked = Select::with_theme(&theme)
        .with_prompt("Video codec")
        .items(&codec_labels)
        .default(current)
        .interact()?;
    spec.video_codec = VIDEO_CODEC_CHOICES[picked].1.to_string();

    let mut res_labels = vec!["Same as source".to_string()];
    res_labels.extend(
        RESOLUTIONS
            .iter()
            .map(|(label, w, h)| format!("{label} ({w}x{h})")),
    );
    let picked = Select::with_theme(&theme)
        .with_prompt("Resolution")
        .items(&res_labels)
        .default(0)
        .interact()?;
    spec.resolution = (picked > 0).then(|| {
        let (_, w, h) = RESOLUTIONS[picked - 1];
        (w, h)
    });

    let mut fmt_labels = vec!["Same as source".to_string()];
    fmt_labels.extend(
        PIX_FMT_LABELS
            .iter()
            .zip(PIX_FMTS)
            .map(|(label, fmt)| format!("{label} ({fmt})")),
    );
    let picked = Select::with_theme(&theme)
        .with_prompt("Bit depth")
        .items(&fmt_labels)
        .default(0)
        .interact()?;
    spec.pix_fmt = (picked > 0).then(|| PIX_FMTS[picked - 1].to_string());

    let mut preset_labels = vec!["Encoder default"];
    preset_labels.extend(PRESETS);
    let picked = Select::with_theme(&theme)
        .with_prompt("Preset")
        .items(&preset_labels)
        .default(0)
        .interact()?;
    spec.preset = (picked > 0).then(|| PRESETS[picked - 1].to_string());

    let default_out = default_output(input, spec.container);
    let raw_out: String = Input::with_theme(&theme)
        .with_prompt(format!(
            "Output file path [{}]",
            default_out.as_os_str().to_string_lossy()
        ))
        .allow_empty(true)
        .interact_text()?;
    let output = if raw_out.trim().is_empty() {
        default_out
    } else {
        PathBuf::from(raw_out.trim())
    };

    Ok(output)
}
