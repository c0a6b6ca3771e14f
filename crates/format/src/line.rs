//! LineFormat - compiled log line templates
//!
//! A line template is compiled once into an ordered fragment program;
//! rendering walks the program and appends each fragment's output into a
//! caller-provided buffer so per-record allocation is amortised away.

use quill_protocol::{tag_memo, Record};

use crate::time::TimeFormat;

/// Default line template
pub const DEFAULT_LINE_FORMAT: &str = "%t | %S | %T | %m";

/// One step of the compiled line program
#[derive(Debug, Clone)]
enum Fragment {
    /// Literal text copied into the output
    Literal(String),
    /// `%t` - the record's timestamp
    Timestamp,
    /// `%s` - the full `file::line` source literal
    Source,
    /// `%S` - the source literal stripped of any path prefix
    SourceBasename,
    /// `%T` - the memoised comma-joined tag list
    Tags,
    /// `%m` - the message body
    Message,
}

/// Compiled line template
///
/// # Tokens
///
/// - `%t` - timestamp of the record, rendered per the time template
/// - `%s` - source information (`file::line`) of the logged line
/// - `%S` - source information stripped of any path elements
/// - `%T` - tags associated with the record. This assumes tags on any given
///   logging line are not modified dynamically, which is what lets the tag
///   lookup be memoised per source location.
/// - `%m` - message content
/// - `%%` - a percent sign
///
/// Any other text is preserved verbatim, including unrecognised `%x`
/// sequences, which pass through as the two literal characters.
#[derive(Debug, Clone)]
pub struct LineFormat {
    fragments: Vec<Fragment>,
    time: TimeFormat,
}

impl LineFormat {
    /// Compile a line template together with its timestamp template
    pub fn compile(line_template: &str, time_template: &str) -> Self {
        let mut fragments = Vec::new();
        let mut pending = String::new();

        let mut chars = line_template.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '%' {
                pending.push(ch);
                continue;
            }

            let fragment = match chars.peek().copied() {
                Some('t') => Fragment::Timestamp,
                Some('s') => Fragment::Source,
                Some('S') => Fragment::SourceBasename,
                Some('T') => Fragment::Tags,
                Some('m') => Fragment::Message,
                Some('%') => {
                    chars.next();
                    pending.push('%');
                    continue;
                }
                // Unrecognised marker (or trailing '%'): preserve verbatim.
                _ => {
                    pending.push('%');
                    continue;
                }
            };
            chars.next();

            if !pending.is_empty() {
                fragments.push(Fragment::Literal(std::mem::take(&mut pending)));
            }
            fragments.push(fragment);
        }
        if !pending.is_empty() {
            fragments.push(Fragment::Literal(pending));
        }

        Self {
            fragments,
            time: TimeFormat::compile(time_template),
        }
    }

    /// Render a record into `out`
    pub fn render(&self, record: &Record, out: &mut String) {
        for fragment in &self.fragments {
            match fragment {
                Fragment::Literal(text) => out.push_str(text),
                Fragment::Timestamp => self.time.render(record.timestamp(), out),
                Fragment::Source => out.push_str(record.source()),
                Fragment::SourceBasename => out.push_str(source_basename(record.source())),
                Fragment::Tags => {
                    out.push_str(&tag_memo().joined(record.source(), record.tags()))
                }
                Fragment::Message => out.push_str(record.message()),
            }
        }
    }

    /// Render a record into a fresh string
    pub fn format(&self, record: &Record) -> String {
        let mut out = String::with_capacity(128);
        self.render(record, &mut out);
        out
    }
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::compile(DEFAULT_LINE_FORMAT, crate::time::DEFAULT_TIME_FORMAT)
    }
}

/// Strip the longest prefix ending in `/` or `\`
///
/// Records are stamped with a compiler-provided literal, so both separators
/// occur in the wild depending on the build host.
fn source_basename(source: &str) -> &str {
    match source.rfind(|c| c == '/' || c == '\\') {
        Some(idx) => &source[idx + 1..],
        None => source,
    }
}
