pub mod batch;
pub mod error;
pub mod extract;
pub mod name_match;
pub mod organize;
pub mod report;
pub mod submission;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zip::ZipArchive;

pub use error::ArchiveError;
pub use report::{BatchReport, Diagnostic, DiagnosticKind};
pub use submission::{ExportParser, SubmissionParser, SubmissionRecord};

/// Name the metadata file is given inside each submission directory.
pub const DEFAULT_INFO_FILENAME: &str = "submission.txt";

/// Exit status for any fatal error.
pub const EXIT_FAILURE: u8 = 1;

fn default_output() -> PathBuf {
    PathBuf::from(".")
}

fn default_info_filename() -> String {
    DEFAULT_INFO_FILENAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Exported submissions zip file
    pub archive: PathBuf,
    /// Root of the per-assignment tree
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Name for the extracted metadata file; empty keeps the archive name
    #[serde(default = "default_info_filename")]
    pub info_filename: String,
    /// Where to save the JSON report, if anywhere
    #[serde(default)]
    pub report: Option<PathBuf>,
}

impl ProcessOptions {
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            output: default_output(),
            info_filename: default_info_filename(),
            report: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_info_filename(mut self, name: impl Into<String>) -> Self {
        self.info_filename = name.into();
        self
    }

    pub fn with_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report = Some(path.into());
        self
    }
}

/// Type alias for progress callback: (stage, current, total, message)
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + 'a;

/// Open the export zip. Failure here ends the run.
pub fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| ArchiveError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Run the whole unpacking pipeline with progress reporting.
///
/// Errors are returned only for problems with the archive as a whole or with
/// writing the requested report; per-submission problems are in the report.
pub fn process(options: &ProcessOptions, progress_callback: &ProgressCallback<'_>) -> anyhow::Result<BatchReport> {
    process_with_parser(options, &ExportParser, progress_callback)
}

/// Same as [`process`], with a caller-supplied metadata parser.
pub fn process_with_parser<P: SubmissionParser + ?Sized>(
    options: &ProcessOptions,
    parser: &P,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<BatchReport> {
    let mut archive = open_archive(&options.archive)?;
    tracing::info!(
        archive = %options.archive.display(),
        entries = archive.len(),
        output = %options.output.display(),
        "opened archive"
    );

    let report = batch::process_archive(
        &mut archive,
        &options.output,
        &options.info_filename,
        parser,
        progress_callback,
    );

    if let Some(path) = &options.report {
        report.write_json(path)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::extract::tests::zip_bytes;
    use std::io::{BufRead, Read};
    use tempfile::tempdir;

    const MEMBER: &str = "hw1_abc123456_attempt_2023-09-01-14-30-00.txt";
    const INFO: &str = "Name: Jane Doe (abc123456)
Assignment: hw1
Date Submitted: Friday, September 1, 2023 2:30:00 PM CDT

Files:
\tOriginal filename: a.pdf
\tFilename: hw1_abc123456_attempt_2023-09-01-14-30-00_a.pdf
\tOriginal filename: b.py
\tFilename: hw1_abc123456_attempt_2023-09-01-14-30-00_b.py
";

    fn write_zip(dir: &Path) -> PathBuf {
        let path = dir.join("gradebook.zip");
        std::fs::write(
            &path,
            zip_bytes(&[
                (MEMBER, INFO.as_bytes()),
                ("hw1_abc123456_attempt_2023-09-01-14-30-00_a.pdf", b"pdf"),
                ("hw1_abc123456_attempt_2023-09-01-14-30-00_b.py", b"print(1)"),
            ]),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_process_end_to_end() {
        let dir = tempdir().unwrap();
        let zip = write_zip(dir.path());
        let out = dir.path().join("out");

        let options = ProcessOptions::new(&zip).with_output(&out);
        let report = process(&options, &|_, _, _, _| {}).unwrap();
        assert!(report.is_clean());

        let leaf = out.join("hw1").join("Jane Doe (abc123456)").join("2023-09-01");
        assert_eq!(std::fs::read_to_string(leaf.join("submission.txt")).unwrap(), INFO);
        assert_eq!(std::fs::read(leaf.join("a.pdf")).unwrap(), b"pdf");
        assert_eq!(std::fs::read(leaf.join("b.py")).unwrap(), b"print(1)");
    }

    #[test]
    fn test_report_written() {
        let dir = tempdir().unwrap();
        let zip = write_zip(dir.path());
        let report_path = dir.path().join("report.json");

        let options = ProcessOptions::new(&zip)
            .with_output(dir.path().join("out"))
            .with_report(&report_path);
        process(&options, &|_, _, _, _| {}).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&std::fs::read(&report_path).unwrap()).unwrap();
        assert_eq!(value["candidates"], 1);
        assert_eq!(value["diagnostics"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_missing_archive_is_open_error() {
        let dir = tempdir().unwrap();
        let options = ProcessOptions::new(dir.path().join("nope.zip"));
        let err = process(&options, &|_, _, _, _| {}).unwrap_err();
        assert!(matches!(err.downcast_ref::<ArchiveError>(), Some(ArchiveError::Open { .. })));
    }

    #[test]
    fn test_non_zip_is_invalid_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.zip");
        std::fs::write(&path, "This is a plain text file and not a zip archive at all.\n".repeat(8)).unwrap();

        let err = process(&ProcessOptions::new(&path), &|_, _, _, _| {}).unwrap_err();
        assert!(matches!(err.downcast_ref::<ArchiveError>(), Some(ArchiveError::Invalid { .. })));
        assert!(err.to_string().starts_with("invalid zip file"));
    }

    /// Parser that accepts anything and records a fixed submission.
    struct FixedParser;

    impl SubmissionParser for FixedParser {
        fn parse(&self, reader: &mut dyn BufRead) -> Result<SubmissionRecord, ParseError> {
            let mut sink = String::new();
            reader.read_to_string(&mut sink)?;
            let submitted = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(23, 0, 0)
                .unwrap();
            Ok(SubmissionRecord::new("Fixed (fix000000)".into(), "custom".into(), submitted, vec![]))
        }
    }

    #[test]
    fn test_custom_parser() {
        let dir = tempdir().unwrap();
        let zip = write_zip(dir.path());
        let out = dir.path().join("out");

        let report = process_with_parser(&ProcessOptions::new(&zip).with_output(&out), &FixedParser, &|_, _, _, _| {})
            .unwrap();
        assert!(report.is_clean());
        assert!(out
            .join("custom")
            .join("Fixed (fix000000)")
            .join("2024-02-29")
            .join("submission.txt")
            .exists());
    }

    #[test]
    fn test_options_defaults_from_json() {
        let options: ProcessOptions = serde_json::from_str(r#"{"archive": "subs.zip"}"#).unwrap();
        assert_eq!(options.output, PathBuf::from("."));
        assert_eq!(options.info_filename, DEFAULT_INFO_FILENAME);
        assert!(options.report.is_none());
    }
}
