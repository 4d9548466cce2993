//! Error types for each stage of unpacking.
//!
//! Archive-level errors end the run. Everything else is scoped to a single
//! submission and is turned into a [`crate::report::Diagnostic`] by the batch
//! driver.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The archive itself could not be used. Fatal to the whole run.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Path missing or unreadable
    #[error("error opening file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File opened but is not a zip archive
    #[error("invalid zip file: {}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Malformed submission metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", location(.line))]
pub struct FormatError {
    /// 1-based line number, 0 when the problem is the file as a whole
    pub line: usize,
    pub message: String,
}

impl FormatError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

fn location(line: &usize) -> String {
    match line {
        0 => String::new(),
        n => format!("line {n}: "),
    }
}

/// Failure to set up the submission directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The leaf directory was already there
    #[error("submission directory already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// A path component derived from metadata cannot be used as a directory name
    #[error("unusable directory name {name:?}")]
    InvalidComponent { name: String },

    #[error("cannot create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to extract or rename one file out of the archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{member}: not found in archive")]
    MissingMember { member: String },

    /// Member or target name would escape the submission directory
    #[error("{name:?}: unsafe file name")]
    UnsafeName { name: String },

    /// Renaming would overwrite a file already in the submission directory
    #[error("{}: already exists", path.display())]
    TargetExists { path: PathBuf },

    #[error("{member}: {source}")]
    Zip {
        member: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Anything that stops a metadata file from becoming a record.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("cannot read submission file: {0}")]
    Read(#[from] io::Error),
}
