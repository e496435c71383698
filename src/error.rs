/// Error types for the circle counter
///
/// Only failures that stop a session from starting (or end it early) live here.
/// Interaction no-ops are not errors; they are reported as `Outcome::NoOp`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterError {
    /// The image file could not be read from disk
    #[error("could not load image at path {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a decodable image
    #[error("could not load image at path {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The blocking decode task panicked or was cancelled
    #[error("image decoding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The settings file is missing or malformed
    #[error("invalid settings file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The settings file could not be read
    #[error("could not read settings file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the image path from the console failed
    #[error("could not read the image path: {0}")]
    Prompt(#[source] std::io::Error),

    /// The user dismissed the prompt and the file picker
    #[error("no image selected")]
    NoImage,

    /// The loader runtime could not be started
    #[error("could not start the loader runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The window or its event loop failed
    #[error("user interface error: {0}")]
    Ui(#[from] iced::Error),
}
