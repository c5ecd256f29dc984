use regex::Regex;
use std::sync::LazyLock;

static CONTENT_RANGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bytes (\d+)-(\d+)/(\d+)").unwrap());

/// A satisfied `Content-Range` of a partial response, `bytes <start>-<end>/<total>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ContentRange {
    pub fn new(start: u64, end: u64, total: u64) -> Self {
        Self { start, end, total }
    }

    /// Parse the header value. Unsatisfied ranges (`bytes */100`) and unknown totals
    /// (`bytes 0-99/*`) yield `None`.
    pub fn parse(header: &str) -> Option<Self> {
        let captures = CONTENT_RANGE_REGEX.captures(header.trim())?;
        let start = captures.get(1)?.as_str().parse().ok()?;
        let end = captures.get(2)?.as_str().parse().ok()?;
        let total = captures.get(3)?.as_str().parse().ok()?;
        Some(Self { start, end, total })
    }

    /// Prefix that keeps different ranges of one resource in different local files.
    pub fn file_name_prefix(&self) -> String {
        format!("ranged-{}-{}-", self.start, self.end)
    }
}
