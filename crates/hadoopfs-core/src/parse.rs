//! Parsers for `hadoop fs` output.
//!
//! Listing lines look like
//!
//! ```text
//! -rw-r--r--   3 dave supergroup       3276 2010-01-13 14:00 /foo/bar
//! drwxr-xr-x   - dave supergroup          0 2010-01-13 14:00 /foo/baz
//! -rwxrwxrwx   1               3276 2010-01-13 14:00 /s3/has/no/owner
//! ```
//!
//! The path is everything after the `HH:MM` field and may contain spaces,
//! so lines are split on single spaces and the tail is re-joined verbatim.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FsError, FsResult};
use crate::process::{CommandOutput, Invocation};
use crate::vfs::EntryKind;

/// Stderr fragments that mean "target doesn't exist".
pub const NOT_FOUND_MARKERS: &[&str] = &["No such file or directory", "does not exist"];

static DU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s+(?:\d+\s+)?(.*)$").expect("du regex is valid")
});

// `hadoop fs -dus` on old clusters: path first, then size.
static DUS_LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*\S)\s+(\d+)\s*$").expect("dus regex is valid")
});

/// One parsed listing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsLine {
    pub kind: EntryKind,
    pub size: Option<u64>,
    /// Path exactly as printed: absolute path or full URI.
    pub path: String,
}

fn is_time(field: &str) -> bool {
    let b = field.as_bytes();
    b.len() == 5 && b[2] == b':' && b[..2].iter().chain(&b[3..]).all(u8::is_ascii_digit)
}

fn is_date(field: &str) -> bool {
    let b = field.as_bytes();
    b.len() == 10 && b[4] == b'-' && b[7] == b'-'
}

/// Parse one line of `-ls`/`-ls -R` output.
///
/// Returns `Ok(None)` for lines that carry no entry (blank, `Found N items`).
pub fn parse_ls_line(line: &str) -> FsResult<Option<LsLine>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.starts_with("Found ") {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(' ').collect();
    let time_index = fields
        .iter()
        .enumerate()
        .position(|(i, f)| i > 0 && is_time(f) && is_date(fields[i - 1]))
        .or_else(|| fields.iter().position(|f| is_time(f)))
        .ok_or_else(|| FsError::unexpected_output("ls", line))?;

    let path = fields[time_index + 1..].join(" ");
    if path.is_empty() {
        return Err(FsError::unexpected_output("ls", line));
    }

    let kind = if fields[0].starts_with('d') {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    // Size is the last non-empty field before the date.
    let date_index = time_index.saturating_sub(1);
    let size = fields[..date_index]
        .iter()
        .rev()
        .find(|f| !f.is_empty())
        .and_then(|f| f.parse::<u64>().ok());

    Ok(Some(LsLine { kind, size, path }))
}

/// Parse one line of `-du -s` output into `(bytes, path)`.
///
/// Accepts `<bytes> <path>`, `<bytes> <disk-consumed> <path>` and the old
/// `-dus` shape `<path> <bytes>`. Blank lines give `Ok(None)`.
pub fn parse_du_line(line: &str) -> FsResult<Option<(u64, String)>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let bad = || FsError::unexpected_output("du", line);

    if let Some(caps) = DU_RE.captures(line) {
        let bytes = caps[1].parse().map_err(|_| bad())?;
        return Ok(Some((bytes, caps[2].to_string())));
    }
    if let Some(caps) = DUS_LEGACY_RE.captures(line) {
        let bytes = caps[2].parse().map_err(|_| bad())?;
        return Ok(Some((bytes, caps[1].to_string())));
    }
    // A bare number with nothing after it.
    line.trim()
        .parse()
        .map(|bytes| Some((bytes, String::new())))
        .map_err(|_| bad())
}

/// Parse all `-du` output.
pub fn parse_du(stdout: &str) -> FsResult<Vec<(u64, String)>> {
    stdout
        .lines()
        .filter_map(|line| parse_du_line(line).transpose())
        .collect()
}

/// True if this stderr says the target is missing.
pub fn is_not_found(stderr: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m))
}

/// True if every non-blank stderr line contains one of `ok_stderr`.
pub fn stderr_is_tolerated(stderr: &str, ok_stderr: &[&str]) -> bool {
    !ok_stderr.is_empty()
        && stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .all(|l| ok_stderr.iter().any(|ok| l.contains(ok)))
}

/// Map a finished invocation to success or the right error.
///
/// Non-zero status with a "missing" marker on stderr is `PathNotFound`;
/// with only tolerated stderr it's success; anything else is
/// `BackendCommand` with stderr kept verbatim.
pub fn check_status(
    invocation: &Invocation,
    output: &CommandOutput,
    ok_stderr: &[&str],
) -> FsResult<()> {
    if output.success() {
        return Ok(());
    }
    if is_not_found(&output.stderr) {
        let target = invocation.args.last().cloned().unwrap_or_default();
        return Err(FsError::not_found(target));
    }
    if stderr_is_tolerated(&output.stderr, ok_stderr) {
        return Ok(());
    }
    Err(FsError::BackendCommand {
        command: invocation.command_line(),
        status: output.status,
        stderr: output.stderr.clone(),
    })
}
