//! TimeFormat - strftime-style timestamp rendering with fractional seconds
//!
//! The template language is `chrono`'s strftime dialect plus one extra
//! marker: `$N`, where `N` is a digit 1-9 declaring how many fractional
//! second digits to render. `"%Y/%m/%d %H:%M:%S.$6"` renders
//! `2024/01/02 03:04:05.123456`.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

/// Default timestamp template
pub const DEFAULT_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S.$6";

/// Fractional digits used when no `$N` marker appears in the template
pub const DEFAULT_PRECISION: usize = 6;

/// One step of the compiled timestamp program
#[derive(Debug, Clone)]
enum Segment {
    /// A chunk rendered through `chrono`'s strftime formatter
    Strftime(String),
    /// A chunk copied through unchanged (malformed strftime specifiers land
    /// here so a bad template degrades to literal text instead of panicking)
    Literal(String),
    /// The fractional-seconds injection point
    Fraction,
}

/// Compiled timestamp template
///
/// Compilation walks the template once, extracting the precision from `$N`
/// markers (the last marker wins when several appear) and splitting the rest
/// into strftime segments. Rendering substitutes each marker with the
/// fractional part of the instant, zero-padded and truncated to the
/// precision.
///
/// A `$` followed by anything other than a digit 1-9 is preserved verbatim.
#[derive(Debug, Clone)]
pub struct TimeFormat {
    /// Fractional digits to render, clamped to [1, 9]
    precision: usize,

    /// Pre-split template
    segments: Vec<Segment>,
}

impl TimeFormat {
    /// Compile a timestamp template
    pub fn compile(template: &str) -> Self {
        let mut precision = DEFAULT_PRECISION;
        let mut segments = Vec::new();
        let mut pending = String::new();

        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '$' {
                pending.push(ch);
                continue;
            }

            match chars.peek().copied() {
                Some(digit @ '1'..='9') => {
                    chars.next();
                    precision = digit as usize - '0' as usize;
                    flush_segment(&mut segments, &mut pending);
                    segments.push(Segment::Fraction);
                }
                // A literal '$' (trailing, '$0', or followed by a non-digit)
                // passes through unchanged.
                _ => pending.push('$'),
            }
        }
        flush_segment(&mut segments, &mut pending);

        Self {
            precision: precision.clamp(1, 9),
            segments,
        }
    }

    /// Fractional digits this format renders
    #[inline]
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Render an instant into `out`
    pub fn render(&self, instant: &DateTime<Local>, out: &mut String) {
        for segment in &self.segments {
            match segment {
                Segment::Strftime(fmt) => {
                    let _ = write!(out, "{}", instant.format(fmt));
                }
                Segment::Literal(text) => out.push_str(text),
                Segment::Fraction => self.render_fraction(instant, out),
            }
        }
    }

    /// Render an instant into a fresh string
    pub fn format(&self, instant: &DateTime<Local>) -> String {
        let mut out = String::with_capacity(32);
        self.render(instant, &mut out);
        out
    }

    fn render_fraction(&self, instant: &DateTime<Local>, out: &mut String) {
        // Leap seconds are represented by chrono as nanos >= 1e9; clamp so
        // the padded string is always exactly nine digits.
        let nanos = instant.timestamp_subsec_nanos().min(999_999_999);

        let mut padded = String::with_capacity(9);
        let _ = write!(padded, "{nanos:09}");
        out.push_str(&padded[..self.precision]);
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self::compile(DEFAULT_TIME_FORMAT)
    }
}

/// Move `pending` into the segment list, routing malformed strftime text to
/// a literal segment so rendering never fails.
fn flush_segment(segments: &mut Vec<Segment>, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let text = std::mem::take(pending);
    let well_formed = StrftimeItems::new(&text).all(|item| !matches!(item, Item::Error));
    segments.push(if well_formed {
        Segment::Strftime(text)
    } else {
        Segment::Literal(text)
    });
}
