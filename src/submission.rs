use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{BufRead, Read};

use chrono::NaiveDateTime;
use encoding_rs::WINDOWS_1252;

use crate::error::{FormatError, ParseError};

/// Accepted `Date Submitted:` layouts, tried in order after any trailing
/// timezone abbreviation has been dropped.
const SUBMITTED_FORMATS: &[&str] = &[
    "%A, %B %d, %Y %I:%M:%S %p", // Friday, September 1, 2023 2:30:00 PM
    "%Y-%m-%d %H:%M:%S",
];

/// One parsed submission metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    /// Student display name with id, e.g. `Jane Doe (abc123456)`
    pub name: String,
    pub assignment_name: String,
    pub submitted: NaiveDateTime,
    /// `YYYY-MM-DD`
    pub submission_date: String,
    /// `HH-MM-SS`
    pub submission_time: String,
    /// Archive member name -> file name to extract it as. Member names are unique.
    pub file_renames: Vec<(String, String)>,
}

impl SubmissionRecord {
    pub fn new(
        name: String,
        assignment_name: String,
        submitted: NaiveDateTime,
        file_renames: Vec<(String, String)>,
    ) -> Self {
        Self {
            name,
            assignment_name,
            submission_date: submitted.format("%Y-%m-%d").to_string(),
            submission_time: submitted.format("%H-%M-%S").to_string(),
            submitted,
            file_renames,
        }
    }
}

/// Turns the text of a submission metadata file into a [`SubmissionRecord`].
pub trait SubmissionParser {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<SubmissionRecord, ParseError>;
}

/// Parser for the text files written by the course-management export.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportParser;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Body,
    Files,
}

impl SubmissionParser for ExportParser {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<SubmissionRecord, ParseError> {
        let mut name = None;
        let mut assignment = None;
        let mut submitted = None;
        let mut renames: Vec<(String, String)> = Vec::new();
        let mut seen_members: HashSet<String> = HashSet::new();
        let mut pending_original: Option<(usize, String)> = None;
        let mut section = Section::Header;

        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        let text = decode_metadata(&raw);

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim_start_matches('\u{feff}').trim();

            match line {
                "Submission Field:" | "Comments:" => {
                    section = Section::Body;
                    continue;
                }
                "Files:" => {
                    section = Section::Files;
                    continue;
                }
                _ => {}
            }

            match section {
                Section::Header => {
                    if let Some(value) = line.strip_prefix("Name:") {
                        name = Some(required(line_no, "Name", value)?);
                    } else if let Some(value) = line.strip_prefix("Assignment:") {
                        assignment = Some(required(line_no, "Assignment", value)?);
                    } else if let Some(value) = line.strip_prefix("Date Submitted:") {
                        let value = required(line_no, "Date Submitted", value)?;
                        let dt = parse_submitted(&value).ok_or_else(|| {
                            FormatError::new(line_no, format!("unrecognized submission date {:?}", value))
                        })?;
                        submitted = Some(dt);
                    }
                }
                Section::Body => {}
                Section::Files => {
                    if let Some(value) = line.strip_prefix("Original filename:") {
                        if let Some((prev, _)) = pending_original {
                            return Err(FormatError::new(
                                prev,
                                "Original filename without a matching Filename",
                            )
                            .into());
                        }
                        pending_original = Some((line_no, required(line_no, "Original filename", value)?));
                    } else if let Some(value) = line.strip_prefix("Filename:") {
                        let member = required(line_no, "Filename", value)?;
                        let Some((_, original)) = pending_original.take() else {
                            return Err(FormatError::new(
                                line_no,
                                "Filename without a preceding Original filename",
                            )
                            .into());
                        };
                        if !seen_members.insert(member.clone()) {
                            return Err(FormatError::new(
                                line_no,
                                format!("attachment {:?} listed twice", member),
                            )
                            .into());
                        }
                        renames.push((member, original));
                    }
                }
            }
        }

        if let Some((prev, _)) = pending_original {
            return Err(FormatError::new(prev, "Original filename without a matching Filename").into());
        }

        let name = name.ok_or_else(|| FormatError::new(0, "missing Name"))?;
        let assignment = assignment.ok_or_else(|| FormatError::new(0, "missing Assignment"))?;
        let submitted = submitted.ok_or_else(|| FormatError::new(0, "missing Date Submitted"))?;

        Ok(SubmissionRecord::new(name, assignment, submitted, renames))
    }
}

/// Decode a metadata file, trying UTF-8 first, then Windows-1252
/// (a UTF-16 byte order mark is honoured).
fn decode_metadata(raw: &[u8]) -> Cow<'_, str> {
    if let Ok(s) = std::str::from_utf8(raw) {
        return Cow::Borrowed(s);
    }

    let (decoded, encoding, had_errors) = WINDOWS_1252.decode(raw);
    if !had_errors {
        tracing::debug!(encoding = encoding.name(), "metadata file is not UTF-8");
        return decoded;
    }

    String::from_utf8_lossy(raw)
}

fn required(line: usize, key: &str, value: &str) -> Result<String, FormatError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormatError::new(line, format!("empty {}", key)));
    }
    Ok(value.to_string())
}

/// Parse a `Date Submitted:` value, ignoring a trailing timezone abbreviation.
fn parse_submitted(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let without_tz = match value.rsplit_once(' ') {
        Some((head, tz))
            if tz.chars().all(|c| c.is_ascii_alphabetic())
                && !tz.eq_ignore_ascii_case("AM")
                && !tz.eq_ignore_ascii_case("PM") =>
        {
            head
        }
        _ => value,
    };

    SUBMITTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(without_tz, fmt).ok())
}
