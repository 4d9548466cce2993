use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ExtractError;
use crate::submission::SubmissionRecord;

/// Outcome of extracting every attachment of one submission.
#[derive(Debug, Default)]
pub struct AttachmentResult {
    pub extracted: Vec<PathBuf>,
    pub failures: Vec<ExtractError>,
}

/// Extract the metadata file into `dir` as `target_name`.
/// An empty `target_name` keeps the member's own file name.
pub fn extract_info_file<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    member: &str,
    dir: &Path,
    target_name: &str,
    submitted: Option<&NaiveDateTime>,
) -> Result<PathBuf, ExtractError> {
    let dest = extract_member(archive, member, dir, (!target_name.is_empty()).then_some(target_name))?;
    set_mtime(&dest, submitted);
    Ok(dest)
}

/// Extract each attachment listed in the record under its new name.
/// A failing attachment doesn't stop the others.
pub fn extract_attachments<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    record: &SubmissionRecord,
    dir: &Path,
) -> AttachmentResult {
    let mut result = AttachmentResult::default();

    for (member, new_name) in &record.file_renames {
        match extract_member(archive, member, dir, Some(new_name.as_str())) {
            Ok(dest) => {
                set_mtime(&dest, Some(&record.submitted));
                tracing::debug!(member = %member, dest = %dest.display(), "extracted attachment");
                result.extracted.push(dest);
            }
            Err(e) => result.failures.push(e),
        }
    }

    result
}

/// Copy one archive member into `dir` as `new_name`, or under the last
/// component of its own name. Never replaces an existing file.
fn extract_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    member: &str,
    dir: &Path,
    new_name: Option<&str>,
) -> Result<PathBuf, ExtractError> {
    if let Some(name) = new_name {
        if !is_plain_file_name(name) {
            return Err(ExtractError::UnsafeName {
                name: name.to_string(),
            });
        }
    }

    let mut entry = match archive.by_name(member) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(ExtractError::MissingMember {
                member: member.to_string(),
            })
        }
        Err(source) => {
            return Err(ExtractError::Zip {
                member: member.to_string(),
                source,
            })
        }
    };

    let file_name: Option<OsString> = if entry.is_dir() {
        None
    } else if let Some(name) = new_name {
        Some(OsString::from(name))
    } else {
        entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_os_string()))
    };
    let Some(file_name) = file_name else {
        return Err(ExtractError::UnsafeName {
            name: member.to_string(),
        });
    };

    let dest = dir.join(file_name);
    let file = match OpenOptions::new().write(true).create_new(true).open(&dest) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ExtractError::TargetExists { path: dest })
        }
        Err(source) => return Err(ExtractError::Io { path: dest, source }),
    };

    let mut out = BufWriter::new(file);
    let copied = io::copy(&mut entry, &mut out).and_then(|_| out.flush());
    if let Err(source) = copied {
        drop(out);
        fs::remove_file(&dest).ok();
        return Err(ExtractError::Io { path: dest, source });
    }

    Ok(dest)
}

/// A single normal path component with no separators.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Stamp the submission time on an extracted file (best effort).
fn set_mtime(path: &Path, submitted: Option<&NaiveDateTime>) {
    let Some(dt) = submitted else {
        return;
    };
    // NaiveDateTime is local time; convert back to UTC epoch for mtime
    if let Some(local) = dt.and_local_timezone(chrono::Local).single() {
        let ft = filetime::FileTime::from_unix_time(local.timestamp(), 0);
        filetime::set_file_mtime(path, ft).ok();
    }
}
