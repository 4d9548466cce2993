use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{DirectoryError, ExtractError, ParseError};

/// What went wrong with one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Metadata file is malformed
    Format,
    /// Metadata could not be read for any other reason
    Unexpected,
    /// Leaf directory was already there; submission skipped
    DirectoryExists,
    /// Directory could not be created; submission skipped
    CreateDirectory,
    /// Metadata file could not be extracted or renamed
    InfoFile,
    /// One attachment could not be extracted or renamed
    Attachment,
}

/// A per-submission failure, kept until the end of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Archive member name of the submission's metadata file
    pub member: String,
    /// File or directory involved, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Error text including its cause
    pub detail: String,
}

impl Diagnostic {
    pub fn parse(member: &str, err: &ParseError) -> Self {
        let kind = match err {
            ParseError::Format(_) => DiagnosticKind::Format,
            ParseError::Read(_) => DiagnosticKind::Unexpected,
        };
        Self {
            kind,
            member: member.to_string(),
            path: None,
            detail: err.to_string(),
        }
    }

    pub fn directory(member: &str, err: &DirectoryError) -> Self {
        let (kind, path) = match err {
            DirectoryError::AlreadyExists { path } => (DiagnosticKind::DirectoryExists, Some(path.clone())),
            DirectoryError::Create { path, .. } => (DiagnosticKind::CreateDirectory, Some(path.clone())),
            DirectoryError::InvalidComponent { .. } => (DiagnosticKind::CreateDirectory, None),
        };
        Self {
            kind,
            member: member.to_string(),
            path,
            detail: err.to_string(),
        }
    }

    pub fn extract(kind: DiagnosticKind, member: &str, err: &ExtractError) -> Self {
        let path = match err {
            ExtractError::TargetExists { path } | ExtractError::Io { path, .. } => Some(path.clone()),
            _ => None,
        };
        Self {
            kind,
            member: member.to_string(),
            path,
            detail: err.to_string(),
        }
    }

    fn headline(&self) -> &'static str {
        match self.kind {
            DiagnosticKind::Format => "Formatting error in submission file",
            DiagnosticKind::Unexpected => "Unexpected error processing",
            DiagnosticKind::DirectoryExists | DiagnosticKind::CreateDirectory => {
                "Failed to create directory for"
            }
            DiagnosticKind::InfoFile => "Failed to extract info file for",
            DiagnosticKind::Attachment => "Failed to expand file for",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:\n    {}", self.headline(), self.member, self.detail)
    }
}

/// Everything one batch run did and failed to do.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Number of members that matched the submission naming convention
    pub candidates: usize,
    /// Submission directories that were created
    pub directories: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of distinct submissions with at least one diagnostic.
    pub fn failed_submissions(&self) -> usize {
        self.diagnostics
            .iter()
            .map(|d| d.member.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Write the itemized failure list followed by a summary line.
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if !self.diagnostics.is_empty() {
            writeln!(
                out,
                "{} problem(s) in {} of {} submission(s):",
                self.diagnostics.len(),
                self.failed_submissions(),
                self.candidates
            )?;
            for (i, d) in self.diagnostics.iter().enumerate() {
                writeln!(out, "{:>3}. {}", i + 1, d)?;
            }
        }
        writeln!(
            out,
            "Unpacked {} of {} submission(s)",
            self.directories.len(),
            self.candidates
        )
    }

    /// Save the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
