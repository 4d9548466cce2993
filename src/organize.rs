use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::DirectoryError;
use crate::submission::SubmissionRecord;

/// Make a metadata value usable as a single path component.
fn path_component(value: &str) -> Result<String, DirectoryError> {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(DirectoryError::InvalidComponent {
            name: value.to_string(),
        });
    }
    Ok(cleaned)
}

/// `root/<assignment>/<student name (id)>/<submission date>`
pub fn submission_directory(root: &Path, record: &SubmissionRecord) -> Result<PathBuf, DirectoryError> {
    Ok(root
        .join(path_component(&record.assignment_name)?)
        .join(path_component(&record.name)?)
        .join(path_component(&record.submission_date)?))
}

/// Create the directory for one submission and return its path.
///
/// Missing parents are created and existing ones reused. The leaf itself
/// must be new: if it already exists, [`DirectoryError::AlreadyExists`] is
/// returned so the caller can flag the collision instead of mixing two
/// submissions' files.
pub fn ensure_submission_directory(root: &Path, record: &SubmissionRecord) -> Result<PathBuf, DirectoryError> {
    let dir = submission_directory(root, record)?;

    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).map_err(|source| DirectoryError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    match fs::create_dir(&dir) {
        Ok(()) => Ok(dir),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(DirectoryError::AlreadyExists { path: dir }),
        Err(source) => Err(DirectoryError::Create { path: dir, source }),
    }
}
