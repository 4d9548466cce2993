use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::ParseError;
use crate::extract;
use crate::name_match::{self, MatchedFilename};
use crate::organize;
use crate::report::{BatchReport, Diagnostic, DiagnosticKind};
use crate::submission::{SubmissionParser, SubmissionRecord};
use crate::ProgressCallback;

/// Unpack every submission in `archive` under `output`.
///
/// Submissions are handled one at a time in archive order. Nothing that goes
/// wrong with a single submission stops the batch; it becomes a diagnostic
/// in the returned report instead.
pub fn process_archive<R, P>(
    archive: &mut ZipArchive<R>,
    output: &Path,
    info_filename: &str,
    parser: &P,
    progress: &ProgressCallback<'_>,
) -> BatchReport
where
    R: Read + Seek,
    P: SubmissionParser + ?Sized,
{
    let names = list_members(archive);
    let candidates = name_match::submission_files(names.iter().map(String::as_str));
    tracing::debug!(members = names.len(), candidates = candidates.len(), "scanned archive");

    let mut report = BatchReport {
        candidates: candidates.len(),
        ..Default::default()
    };
    let total = candidates.len() as u64;

    for (i, sub) in candidates.iter().enumerate() {
        progress("extract", i as u64, total, &sub.member);
        let before = report.diagnostics.len();
        process_submission(archive, sub, output, info_filename, parser, &mut report);
        for d in &report.diagnostics[before..] {
            tracing::warn!(kind = ?d.kind, member = %d.member, "{}", d.detail);
        }
    }
    progress("extract", total, total, "done");

    report
}

/// Member names in archive order. Entries whose header can't be read are skipped.
fn list_members<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Vec<String> {
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        match archive.by_index_raw(i) {
            Ok(entry) => names.push(entry.name().to_string()),
            Err(e) => tracing::debug!(index = i, error = %e, "skipping unreadable entry"),
        }
    }
    names
}

fn process_submission<R, P>(
    archive: &mut ZipArchive<R>,
    sub: &MatchedFilename,
    output: &Path,
    info_filename: &str,
    parser: &P,
    report: &mut BatchReport,
) where
    R: Read + Seek,
    P: SubmissionParser + ?Sized,
{
    let member = sub.member.as_str();

    let record = match read_record(archive, member, parser) {
        Ok(record) => record,
        Err(e) => {
            report.diagnostics.push(Diagnostic::parse(member, &e));
            return;
        }
    };

    let dir = match organize::ensure_submission_directory(output, &record) {
        Ok(dir) => dir,
        Err(e) => {
            report.diagnostics.push(Diagnostic::directory(member, &e));
            return;
        }
    };
    tracing::debug!(member, dir = %dir.display(), "created submission directory");

    // Attachments are still attempted when the info file fails.
    if let Err(e) = extract::extract_info_file(archive, member, &dir, info_filename, Some(&record.submitted)) {
        report
            .diagnostics
            .push(Diagnostic::extract(DiagnosticKind::InfoFile, member, &e));
    }

    let attachments = extract::extract_attachments(archive, &record, &dir);
    for e in &attachments.failures {
        report
            .diagnostics
            .push(Diagnostic::extract(DiagnosticKind::Attachment, member, e));
    }

    tracing::debug!(
        member,
        attachments = attachments.extracted.len(),
        failed = attachments.failures.len(),
        "unpacked submission"
    );
    report.directories.push(dir);
}

fn read_record<R, P>(archive: &mut ZipArchive<R>, member: &str, parser: &P) -> Result<SubmissionRecord, ParseError>
where
    R: Read + Seek,
    P: SubmissionParser + ?Sized,
{
    let entry = archive.by_name(member).map_err(|e| ParseError::Read(io::Error::other(e)))?;
    let mut reader = BufReader::new(entry);
    parser.parse(&mut reader)
}
