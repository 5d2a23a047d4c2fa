//! Flat-text feedback file format
//!
//! ```text
//! # Customer Feedback Analysis
//!
//! ## Detailed Feedback Entries
//!
//! Feedback #1
//! Customer: Alice
//! Department: Electronics
//! Date: 2024-03-01
//! Comment: Great service
//! Sentiment: POSITIVE
//!
//! Feedback #2
//! ...
//! ```
//!
//! Everything before the section marker is ignored. Blocks are separated by
//! blank lines and their lines may appear in any order.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;
use tracing::{debug, warn};

use crate::error::{FeedbackError, Result};
use crate::types::FeedbackEntry;

/// Line that opens the record section
pub const SECTION_MARKER: &str = "## Detailed Feedback Entries";

const FILE_TITLE: &str = "# Customer Feedback Analysis";

const DATE_FORMAT: &str = "%Y-%m-%d";

// One line per field. `[ \t]` rather than `\s` so an empty value never
// captures the line after it.
static FEEDBACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*Feedback #(\d+)[ \t]*$").unwrap());
static CUSTOMER_RE: Lazy<Regex> = Lazy::new(|| field_regex("Customer"));
static DEPARTMENT_RE: Lazy<Regex> = Lazy::new(|| field_regex("Department"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| field_regex("Date"));
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| field_regex("Comment"));
static SENTIMENT_RE: Lazy<Regex> = Lazy::new(|| field_regex("Sentiment"));

fn field_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?m)^[ \t]*{}:[ \t]*(.*?)[ \t]*$", label)).unwrap()
}

/// Parse every well-formed block of a feedback file, in file order.
///
/// Blocks without a `Feedback #<n>` line are dropped; the rest of the file is
/// still parsed.
pub fn parse_entries(text: &str) -> Vec<FeedbackEntry> {
    let mut entries = Vec::new();
    let mut block = String::new();
    let mut in_section = false;

    for line in text.lines() {
        if line.contains(SECTION_MARKER) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }

        if line.trim().is_empty() {
            if !block.is_empty() {
                flush_block(&block, &mut entries);
                block.clear();
            }
        } else {
            block.push_str(line);
            block.push('\n');
        }
    }

    if !block.is_empty() {
        flush_block(&block, &mut entries);
    }

    entries
}

fn flush_block(block: &str, entries: &mut Vec<FeedbackEntry>) {
    match parse_block(block) {
        Ok(entry) => entries.push(entry),
        Err(e) => debug!("Skipping feedback block: {}", e),
    }
}

/// Parse a single block. Fields whose line is missing stay `None`; a label
/// with nothing after it reads back as an empty string.
pub fn parse_block(block: &str) -> Result<FeedbackEntry> {
    let id_text = capture(&FEEDBACK_RE, block)
        .ok_or_else(|| FeedbackError::Malformed("block has no 'Feedback #<id>' line".to_string()))?;
    let id = id_text
        .parse::<u64>()
        .map_err(|e| FeedbackError::Malformed(format!("invalid feedback id '{}': {}", id_text, e)))?;

    let date = capture(&DATE_RE, block).map(|raw| {
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).unwrap_or_else(|_| {
            warn!("Failed to parse date '{}' for feedback #{}, using today", raw, id);
            Local::now().date_naive()
        })
    });

    Ok(FeedbackEntry {
        id: Some(id),
        customer: capture(&CUSTOMER_RE, block),
        department: capture(&DEPARTMENT_RE, block),
        date,
        comment: capture(&COMMENT_RE, block),
        sentiment: capture(&SENTIMENT_RE, block),
    })
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Render the complete file: header, marker, then one block per entry.
///
/// Line breaks inside values are folded to single spaces, so no value can
/// start a line of its own.
pub fn render_entries(entries: &[FeedbackEntry]) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}\n\n{}\n\n", FILE_TITLE, SECTION_MARKER);

    for entry in entries {
        let _ = writeln!(out, "Feedback #{}", entry.id_label());
        write_field(&mut out, "Customer", entry.customer.as_deref());
        write_field(&mut out, "Department", entry.department.as_deref());
        let date = entry.date.map(|d| d.format(DATE_FORMAT).to_string());
        write_field(&mut out, "Date", date.as_deref());
        write_field(&mut out, "Comment", entry.comment.as_deref());
        write_field(&mut out, "Sentiment", entry.sentiment.as_deref());
        out.push('\n');
    }

    out
}

fn write_field(out: &mut String, label: &str, value: Option<&str>) {
    let Some(value) = value else { return };
    let value = single_line(value);
    if value.is_empty() {
        let _ = writeln!(out, "{}:", label);
    } else {
        let _ = writeln!(out, "{}: {}", label, value);
    }
}

fn single_line(value: &str) -> String {
    value
        .lines()
        .flat_map(|line| line.split('\r'))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
