// src/reference/parse.rs
// =============================================================================
// This module turns a GitHub blob URL into something we can download.
//
// Input looks like:
//   https://github.com/<org>/<repo>/blob/<branch>/<path...>#L5-L9
//
// Output:
//   - the raw.githubusercontent.com address of the same file
//   - the zero-based line range selected by the fragment
//   - the file path, used as the default code block title
//
// The reference usually comes straight out of a fenced code block, so it may
// be surrounded by other text and end with a newline. We locate the first
// "https" and drop one trailing wrapper character if there is one.
//
// Rust concepts:
// - Enums with data: LineEnd models "which line does the range stop at"
// - Slice patterns: to pull org/repo/blob/branch out of the path
// - anyhow::Result: parse failures are reported, not recovered from
// =============================================================================

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

/// Host that serves unprocessed file contents
pub const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";

// Characters that may wrap the URL in its surrounding text
const WRAPPER_CHARS: &[char] = &[')', '>', ']', '"', '\'', '`'];

// Where a line range stops
//
// #[serde(tag = "kind")] makes the JSON look like {"kind": "line", "line": 8}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "line", rename_all = "snake_case")]
pub enum LineEnd {
    /// Inclusive zero-based last line
    Line(usize),
    /// The fragment named only a start line (`#L7`)
    Unspecified,
    /// No fragment at all: read to the end of the file
    EndOfFile,
}

// The canonical fetch target derived from a blob URL
//
// Built once per reference and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Absolute raw-content address
    pub url: String,
    /// Zero-based first line
    pub from_line: usize,
    /// Last line of the range
    pub to_line: LineEnd,
    /// File path inside the repository, e.g. "src/file.ts"
    pub title: String,
}

impl Reference {
    // Exclusive end index used to slice the file's lines
    //
    // Mirrors how the fetch has always behaved:
    //   - no fragment reads to the end of the file
    //   - a missing end bound, or an end bound of line 1 (index 0),
    //     selects only the start line
    //
    // TODO: the one-line window for `#L7` is probably unintended; revisit once
    // existing documents no longer rely on it.
    pub fn end_index(&self, line_count: usize) -> usize {
        match self.to_line {
            LineEnd::EndOfFile => line_count,
            LineEnd::Unspecified | LineEnd::Line(0) => self.from_line + 1,
            LineEnd::Line(last) => last + 1,
        }
    }
}

// Parses a GitHub reference string
//
// Parameters:
//   reference: text containing a GitHub blob URL, e.g.
//              "https://github.com/org/repo/blob/main/src/file.ts#L5-L9\n"
//
// Returns: the Reference, or an error if the text is not a usable blob URL
//
// Example:
//   "https://github.com/org/repo/blob/main/src/file.ts"
//   -> url   = "https://raw.githubusercontent.com/org/repo/main/src/file.ts"
//      title = "src/file.ts", lines 0..end of file
pub fn parse_reference(reference: &str) -> Result<Reference> {
    let full_url = locate_url(reference)?;

    // Split "<url>#<fragment>" on the first '#'
    let (base, fragment) = match full_url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (full_url, None),
    };

    let parsed = Url::parse(base).with_context(|| format!("Invalid reference URL: {}", base))?;

    // "/org/repo/blob/branch/a/b.rs" -> ["org", "repo", "blob", "branch", "a", "b.rs"]
    let segments: Vec<&str> = parsed
        .path()
        .strip_prefix('/')
        .unwrap_or(parsed.path())
        .split('/')
        .collect();

    let [org, repo, blob, branch, path @ ..] = segments.as_slice() else {
        bail!("Reference URL must look like /<org>/<repo>/blob/<branch>/<path>: {}", base);
    };

    if *blob != "blob" {
        warn!(segment = %blob, "reference URL has no 'blob' segment, treating it as one");
    }

    let title = path.join("/");
    if title.is_empty() {
        bail!("Reference URL does not name a file: {}", base);
    }

    let (from_line, to_line) = match fragment {
        Some(fragment) => parse_line_range(fragment)?,
        None => (0, LineEnd::EndOfFile),
    };

    let reference = Reference {
        url: format!("{}/{}/{}/{}/{}", RAW_CONTENT_BASE, org, repo, branch, title),
        from_line,
        to_line,
        title,
    };

    debug!(url = %reference.url, from = reference.from_line, to = ?reference.to_line, "parsed reference");
    Ok(reference)
}

// Finds the URL inside the surrounding text
//
// Starts at the first "https" and drops one trailing whitespace or wrapper
// character, so "<https://...>" and "https://...\n" both work.
fn locate_url(reference: &str) -> Result<&str> {
    let start = reference
        .find("https")
        .ok_or_else(|| anyhow!("No https URL found in reference: {:?}", reference))?;
    let url = &reference[start..];

    match url.chars().last() {
        Some(last) if last.is_whitespace() || WRAPPER_CHARS.contains(&last) => {
            Ok(&url[..url.len() - last.len_utf8()])
        }
        _ => Ok(url),
    }
}

// Decodes "L5-L9" into (4, Line(8))
//
// Line numbers in the fragment are 1-based; ours are 0-based.
fn parse_line_range(fragment: &str) -> Result<(usize, LineEnd)> {
    let mut bounds = fragment.split('-');

    // split() always yields at least one item
    let from_line = parse_line_bound(bounds.next().unwrap_or_default())?;
    let to_line = match bounds.next() {
        Some(bound) => LineEnd::Line(parse_line_bound(bound)?),
        None => LineEnd::Unspecified,
    };

    Ok((from_line, to_line))
}

// Decodes one bound such as "L12" into 11
//
// The first character (normally 'L') is skipped and the leading digits are
// read, so trailing junk like "L12?plain" still gives 11.
fn parse_line_bound(bound: &str) -> Result<usize> {
    let mut chars = bound.chars();
    chars.next();
    let rest = chars.as_str();

    let digits_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let number: usize = rest[..digits_len]
        .parse()
        .with_context(|| format!("Invalid line number in fragment: {:?}", bound))?;

    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Line numbers start at 1: {:?}", bound))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_blob_url() {
        let reference = parse_reference("https://github.com/org/repo/blob/main/src/file.ts").unwrap();
        assert_eq!(reference.title, "src/file.ts");
        assert_eq!(
            reference.url,
            "https://raw.githubusercontent.com/org/repo/main/src/file.ts"
        );
        assert_eq!(reference.from_line, 0);
        assert_eq!(reference.to_line, LineEnd::EndOfFile);
    }

    #[test]
    fn test_parse_line_range_fragment() {
        let reference =
            parse_reference("https://github.com/org/repo/blob/main/lib/a.rs#L5-L9").unwrap();
        assert_eq!(reference.from_line, 4);
        assert_eq!(reference.to_line, LineEnd::Line(8));
        assert_eq!(reference.title, "lib/a.rs");
    }

    #[test]
    fn test_trailing_newline_is_dropped() {
        let reference =
            parse_reference("https://github.com/org/repo/blob/dev/x/y/z.py#L1-L3\n").unwrap();
        assert_eq!(reference.url, "https://raw.githubusercontent.com/org/repo/dev/x/y/z.py");
        assert_eq!(reference.to_line, LineEnd::Line(2));
    }

    #[test]
    fn test_url_inside_surrounding_text() {
        let reference =
            parse_reference("see <https://github.com/org/repo/blob/main/README.md>").unwrap();
        assert_eq!(reference.title, "README.md");
        assert_eq!(reference.url, "https://raw.githubusercontent.com/org/repo/main/README.md");
    }

    #[test]
    fn test_wrapping_paren_and_backtick_are_dropped() {
        let reference =
            parse_reference("(see https://github.com/org/repo/blob/main/docs/a.md)").unwrap();
        assert_eq!(reference.title, "docs/a.md");

        let reference =
            parse_reference("`https://github.com/org/repo/blob/main/a.rs#L2-L3`").unwrap();
        assert_eq!(reference.title, "a.rs");
        assert_eq!(reference.to_line, LineEnd::Line(2));
    }

    #[test]
    fn test_bare_url_keeps_last_character() {
        let reference = parse_reference("https://github.com/org/repo/blob/main/Makefile").unwrap();
        assert_eq!(reference.title, "Makefile");
        assert_eq!(reference.url, "https://raw.githubusercontent.com/org/repo/main/Makefile");

        let reference = parse_reference("https://github.com/org/repo/blob/main/a.rs#L2-L9").unwrap();
        assert_eq!(reference.to_line, LineEnd::Line(8));
    }

    #[test]
    fn test_query_string_is_not_part_of_path() {
        let reference =
            parse_reference("https://github.com/org/repo/blob/main/a.go?title=Foo#L2-L4").unwrap();
        assert_eq!(reference.title, "a.go");
        assert_eq!(reference.from_line, 1);
        assert_eq!(reference.to_line, LineEnd::Line(3));
    }

    #[test]
    fn test_single_bound_fragment() {
        let reference = parse_reference("https://github.com/org/repo/blob/main/a.go#L7").unwrap();
        assert_eq!(reference.from_line, 6);
        assert_eq!(reference.to_line, LineEnd::Unspecified);
        assert_eq!(reference.end_index(100), 7);
    }

    #[test]
    fn test_end_index() {
        let mut reference = parse_reference("https://github.com/org/repo/blob/main/a.go").unwrap();
        assert_eq!(reference.end_index(42), 42);

        reference.from_line = 3;
        reference.to_line = LineEnd::Line(5);
        assert_eq!(reference.end_index(42), 6);

        // An end bound of "L1" behaves like a missing one
        reference.to_line = LineEnd::Line(0);
        assert_eq!(reference.end_index(42), 4);
    }

    #[test]
    fn test_lenient_line_numbers() {
        assert_eq!(parse_line_bound("L12?plain").unwrap(), 11);
        assert!(parse_line_bound("Lx").is_err());
        assert!(parse_line_bound("L0").is_err());
    }

    #[test]
    fn test_missing_https_is_an_error() {
        assert!(parse_reference("github.com/org/repo/blob/main/a.rs").is_err());
    }

    #[test]
    fn test_short_path_is_an_error() {
        assert!(parse_reference("https://github.com/org/repo").is_err());
        assert!(parse_reference("https://github.com/org/repo/blob/main").is_err());
    }
}
