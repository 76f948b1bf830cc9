//! Slicing cached documents for presentation.
//!
//! All options apply to the converted text after the cache lookup, so they
//! never affect what is fetched or cached.

use std::str::FromStr;

use crate::error::WebError;

/// A 1-based, inclusive paragraph range. `end == None` means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphRange {
    /// First paragraph (1-based).
    pub start: usize,
    /// Last paragraph, inclusive.
    pub end: Option<usize>,
}

impl FromStr for ParagraphRange {
    type Err = WebError;

    /// Parse `"N"`, `"N-M"` or `"N-"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            WebError::InvalidArgument(format!(
                "paragraphRange must look like \"3\", \"1-5\" or \"4-\" (got '{}')",
                s
            ))
        };
        let parse = |n: &str| n.trim().parse::<usize>().ok().filter(|n| *n >= 1);

        let range = match s.split_once('-') {
            None => {
                let n = parse(s).ok_or_else(invalid)?;
                Self {
                    start: n,
                    end: Some(n),
                }
            }
            Some((start, end)) => {
                let start = parse(start).ok_or_else(invalid)?;
                let end = if end.trim().is_empty() {
                    None
                } else {
                    Some(parse(end).ok_or_else(invalid)?)
                };
                Self { start, end }
            }
        };

        if range.end.is_some_and(|end| end < range.start) {
            return Err(invalid());
        }
        Ok(range)
    }
}

/// How to present a fetched document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Character offset to start from.
    pub start_char: usize,
    /// Maximum characters returned.
    pub max_length: Option<usize>,
    /// Only the content under the heading containing this text.
    pub section: Option<String>,
    /// Only these paragraphs.
    pub paragraph_range: Option<ParagraphRange>,
    /// Only the heading lines (a table of contents).
    pub read_headings: bool,
}

impl ReadOptions {
    /// Whether these options return the document unchanged.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Apply `options` to a markdown-style document.
pub fn apply(document: &str, options: &ReadOptions) -> String {
    if options.read_headings {
        let headings: Vec<&str> = document
            .lines()
            .filter(|line| heading_level(line).is_some())
            .collect();
        if headings.is_empty() {
            return "No headings found.".to_string();
        }
        return headings.join("\n");
    }

    let mut text = document.to_string();

    if let Some(section) = &options.section {
        match extract_section(&text, section) {
            Some(found) => text = found,
            None => return format!("Section \"{}\" not found.", section),
        }
    }

    if let Some(range) = options.paragraph_range {
        text = select_paragraphs(&text, range);
        if text.is_empty() {
            return format!(
                "Paragraph {} is past the end of the document.",
                range.start
            );
        }
    }

    slice_chars(&text, options.start_char, options.max_length)
}

fn heading_level(line: &str) -> Option<usize> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) && line[hashes..].starts_with(' ') {
        Some(hashes)
    } else {
        None
    }
}

/// The heading whose text contains `needle` (case-insensitive) and every
/// line up to the next heading of the same or a higher level.
fn extract_section(document: &str, needle: &str) -> Option<String> {
    let needle = needle.trim().to_lowercase();
    let lines: Vec<&str> = document.lines().collect();

    let (start, level) = lines.iter().enumerate().find_map(|(i, line)| {
        let level = heading_level(line)?;
        line[level..]
            .trim()
            .to_lowercase()
            .contains(&needle)
            .then_some((i, level))
    })?;

    let end = lines[start + 1..]
        .iter()
        .position(|line| heading_level(line).is_some_and(|l| l <= level))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    Some(lines[start..end].join("\n").trim_end().to_string())
}

fn select_paragraphs(document: &str, range: ParagraphRange) -> String {
    let paragraphs: Vec<&str> = document
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let start = range.start - 1;
    if start >= paragraphs.len() {
        return String::new();
    }
    let end = range.end.unwrap_or(paragraphs.len()).min(paragraphs.len());
    paragraphs[start..end].join("\n\n")
}

fn slice_chars(text: &str, start: usize, max_length: Option<usize>) -> String {
    let chars = text.chars().skip(start);
    match max_length {
        Some(max) => chars.take(max).collect(),
        None => chars.collect(),
    }
}
