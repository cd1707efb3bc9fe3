use std::io;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(#[source] io::Error),

    #[error("ffprobe exited with {status}")]
    Failed { status: ExitStatus },

    #[error("could not parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot parse ffprobe duration `{0}`")]
    Duration(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("video codec `{codec}` is not compatible with the {container} container")]
    IncompatibleOptions {
        codec: String,
        container: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("a transcode is already running")]
    Busy,

    #[error("failed to launch ffmpeg: {0}")]
    Launch(#[source] io::Error),

    #[error("ffmpeg failed with {status}")]
    Failure { status: String, log: String },
}
