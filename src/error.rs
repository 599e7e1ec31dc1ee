//! Error kinds raised by the boot image core.
//!
//! Everything is surfaced through `anyhow::Result`; callers that need to tell
//! the kinds apart use `err.downcast_ref::<BootImageError>()`.

use std::path::PathBuf;

use thiserror::Error;

/// Failures owned by the boot root lifecycle and boot description handling.
#[derive(Debug, Error)]
pub enum BootImageError {
    #[error("target directory {} not found", .0.display())]
    TargetDirectoryNotFound(PathBuf),

    #[error("no Boot XML description found in {}", .0.display())]
    ConfigFileNotFound(PathBuf),

    /// A strategy hook was called on a type that does not provide it.
    #[error("{0} is not implemented for this boot image type")]
    NotImplemented(&'static str),

    #[error("system description does not reference a boot description")]
    NoBootDescription,

    #[error("boot description must be loaded before system elements can be imported")]
    BootDescriptionNotLoaded,
}

/// Failures raised while loading or querying an image description.
#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("failed to parse description: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("unexpected root element <{0}>, expected <image>")]
    UnexpectedRoot(String),

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("no image version set in preferences")]
    MissingImageVersion,
}
