use regex::Regex;
use std::sync::LazyLock;

/// `<assignment>_<id>_attempt_<YYYY-MM-DD>-<HH-MM-SS>.txt`
static SUBMISSION_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(.*?)_",                        // assignment, up to the first usable _
        r"([a-z]{3}[0-9]{6})",             // student id
        r"_attempt_",
        r"([0-9]{4}-[0-9]{2}-[0-9]{2})",   // date
        r"-([0-9]{2}-[0-9]{2}-[0-9]{2})",  // time
        r"\.txt$",
    ))
    .unwrap()
});

/// Fields embedded in a submission metadata file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFilename {
    /// Full archive member name that matched
    pub member: String,
    pub assignment: String,
    pub student_id: String,
    pub date: String,
    pub time: String,
}

/// Test one archive member name against the submission naming convention.
/// Anything that doesn't match is simply not a submission file.
pub fn match_submission_file(name: &str) -> Option<MatchedFilename> {
    let caps = SUBMISSION_FILE_RE.captures(name)?;
    Some(MatchedFilename {
        member: name.to_string(),
        assignment: caps[1].to_string(),
        student_id: caps[2].to_string(),
        date: caps[3].to_string(),
        time: caps[4].to_string(),
    })
}

/// Filter an archive listing down to submission metadata files, keeping listing order.
pub fn submission_files<'a, I>(names: I) -> Vec<MatchedFilename>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().filter_map(match_submission_file).collect()
}
