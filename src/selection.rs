use crate::probe::{StreamDescriptor, StreamKind};

pub const AUDIO_CODECS: &[&str] = &["aac", "libopus", "libmp3lame", "ac3", "flac", "eac3", "mp2"];
pub const AUDIO_CHANNELS: &[u8] = &[1, 2, 6];
pub const AUDIO_BITRATES: &[&str] = &[
    "96k", "128k", "256k", "320k", "384k", "448k", "640k", "768k",
];

pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Re-encode options, present on audio streams only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSelection {
    pub reencode: bool,
    pub codec: String,
    pub channels: u8,
    pub bitrate: String,
}

impl Default for AudioSelection {
    fn default() -> Self {
        Self {
            reencode: false,
            codec: DEFAULT_AUDIO_CODEC.to_string(),
            channels: DEFAULT_AUDIO_CHANNELS,
            bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
        }
    }
}

/// Per-stream user choices. Mutated only by explicit user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSelection {
    pub keep: bool,
    pub audio: Option<AudioSelection>,
}

/// Selections for the most recent probe, keyed by original stream index
/// and held in original stream order. Rebuilt from scratch on every probe
/// so entries for a previous file never leak into the next session.
#[derive(Debug, Default, Clone)]
pub struct SelectionSet {
    entries: Vec<(u32, StreamSelection)>,
}

impl SelectionSet {
    pub fn for_streams(streams: &[StreamDescriptor]) -> Self {
        let entries = streams
            .iter()
            .map(|s| {
                let audio = (s.kind == StreamKind::Audio).then(AudioSelection::default);
                (s.index, StreamSelection { keep: true, audio })
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, index: u32) -> Option<&StreamSelection> {
        self.entries.iter().find(|(i, _)| *i == index).map(|(_, s)| s)
    }

    fn get_mut(&mut self, index: u32) -> Option<&mut StreamSelection> {
        self.entries
            .iter_mut()
            .find(|(i, _)| *i == index)
            .map(|(_, s)| s)
    }

    /// Unknown indices are ignored rather than invented.
    pub fn set_keep(&mut self, index: u32, keep: bool) {
        if let Some(sel) = self.get_mut(index) {
            sel.keep = keep;
        }
    }

    pub fn set_audio_reencode(&mut self, index: u32, reencode: bool) {
        if let Some(audio) = self.audio_mut(index) {
            audio.reencode = reencode;
        }
    }

    pub fn set_audio_codec(&mut self, index: u32, codec: &str) {
        if let Some(audio) = self.audio_mut(index) {
            audio.codec = codec.to_string();
        }
    }

    pub fn set_audio_channels(&mut self, index: u32, channels: u8) {
        if let Some(audio) = self.audio_mut(index) {
            audio.channels = channels;
        }
    }

    pub fn set_audio_bitrate(&mut self, index: u32, bitrate: &str) {
        if let Some(audio) = self.audio_mut(index) {
            audio.bitrate = bitrate.to_string();
        }
    }

    pub fn is_kept(&self, index: u32) -> bool {
        self.get(index).is_some_and(|s| s.keep)
    }

    fn audio_mut(&mut self, index: u32) -> Option<&mut AudioSelection> {
        self.get_mut(index).and_then(|s| s.audio.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StreamKind;

    fn descriptor(index: u32, kind: StreamKind) -> StreamDescriptor {
        StreamDescriptor {
            index,
            kind,
            codec_name: None,
            language: "und".to_string(),
            duration: None,
            bit_rate: None,
            video: None,
        }
    }

    #[test]
    fn test_defaults() {
        let streams = [
            descriptor(0, StreamKind::Video),
            descriptor(1, StreamKind::Audio),
        ];
        let set = SelectionSet::for_streams(&streams);

        assert!(set.is_kept(0));
        assert!(set.is_kept(1));
        assert!(set.get(0).unwrap().audio.is_none());

        let audio = set.get(1).unwrap().audio.as_ref().unwrap();
        assert!(!audio.reencode);
        assert_eq!(audio.codec, "aac");
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.bitrate, "128k");
    }

    #[test]
    fn test_explicit_mutation() {
        let streams = [descriptor(3, StreamKind::Audio)];
        let mut set = SelectionSet::for_streams(&streams);

        set.set_keep(3, false);
        set.set_audio_reencode(3, true);
        set.set_audio_codec(3, "libopus");
        set.set_audio_channels(3, 6);
        set.set_audio_bitrate(3, "256k");

        let sel = set.get(3).unwrap();
        assert!(!sel.keep);
        let audio = sel.audio.as_ref().unwrap();
        assert!(audio.reencode);
        assert_eq!(audio.codec, "libopus");
        assert_eq!(audio.channels, 6);
        assert_eq!(audio.bitrate, "256k");
    }

    #[test]
    fn test_unknown_index_is_ignored() {
        let streams = [descriptor(0, StreamKind::Video)];
        let mut set = SelectionSet::for_streams(&streams);

        set.set_keep(9, false);
        set.set_audio_reencode(9, true);
        assert!(set.get(9).is_none());
        assert!(!set.is_kept(9));
    }

    #[test]
    fn test_audio_setters_noop_on_video() {
        let streams = [descriptor(0, StreamKind::Video)];
        let mut set = SelectionSet::for_streams(&streams);

        set.set_audio_reencode(0, true);
        assert!(set.get(0).unwrap().audio.is_none());
    }

    #[test]
    fn test_new_probe_replaces_stale_entries() {
        let first = [descriptor(5, StreamKind::Audio)];
        let mut set = SelectionSet::for_streams(&first);
        set.set_keep(5, false);

        let second = [descriptor(0, StreamKind::Video)];
        set = SelectionSet::for_streams(&second);
        assert!(set.get(5).is_none());
        assert!(set.is_kept(0));
    }
}
