//! Line shapes of the activity log.
//!
//! ```text
//! # Motion activity log (bin width 5 min)                      header
//! 2024-05-10 10:00 - 10:05: Detected  2 motion events.         bin summary
//! 2024-05-10 10:06:12 NETWORK: LAN up, internet unreachable     annotation
//! ```
//!
//! Pruning and restart recovery parse the same shapes back, so the field
//! widths here are load-bearing.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::binning::{BinId, BinWidth};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const CLOCK_FORMAT: &str = "%H:%M";

pub fn header_line(width: BinWidth) -> String {
    format!("# Motion activity log (bin width {} min)", width.minutes())
}

pub fn bin_summary_line(width: BinWidth, bin: BinId, count: u32) -> String {
    let (start, end) = width.bounds(bin);
    format!(
        "{} {} - {}: Detected {:>2} motion events.",
        bin.day.format(DATE_FORMAT),
        start.format(CLOCK_FORMAT),
        end.format(CLOCK_FORMAT),
        count
    )
}

pub fn annotation_line(at: NaiveDateTime, kind: &str, message: &str) -> String {
    format!("{} {}: {}", at.format(TIMESTAMP_FORMAT), kind, message)
}

/// What a log line turned out to be when read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedLine {
    /// Anything without a leading date. Never pruned.
    Header,
    /// A bin summary, stamped with the bin's start.
    BinSummary { start: NaiveDateTime },
    /// `date time KIND: message`.
    Annotation { at: NaiveDateTime },
    /// Leading date but no recognizable time; treated as midnight of that day.
    DateOnly { day: NaiveDate },
}

impl ParsedLine {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match *self {
            ParsedLine::Header => None,
            ParsedLine::BinSummary { start } => Some(start),
            ParsedLine::Annotation { at } => Some(at),
            ParsedLine::DateOnly { day } => Some(day.and_time(NaiveTime::MIN)),
        }
    }
}

pub fn parse_line(line: &str) -> ParsedLine {
    let Some(day) = line
        .get(..10)
        .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
    else {
        return ParsedLine::Header;
    };

    let rest = &line[10..];
    let Some(rest) = rest.strip_prefix(' ') else {
        return ParsedLine::DateOnly { day };
    };

    if let Some(time) = rest
        .get(..8)
        .and_then(|raw| NaiveTime::parse_from_str(raw, "%H:%M:%S").ok())
    {
        return ParsedLine::Annotation {
            at: day.and_time(time),
        };
    }

    if let Some(time) = rest
        .get(..5)
        .and_then(|raw| NaiveTime::parse_from_str(raw, CLOCK_FORMAT).ok())
    {
        if rest[5..].starts_with(" - ") {
            return ParsedLine::BinSummary {
                start: day.and_time(time),
            };
        }
    }

    ParsedLine::DateOnly { day }
}

/// Highest bin index of `day` already present in the log, used to resume the
/// flush cursor after a restart.
pub fn last_logged_bin<'a, I>(lines: I, day: NaiveDate, width: BinWidth) -> Option<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter_map(|line| match parse_line(line) {
            ParsedLine::BinSummary { start } if start.date() == day => {
                Some(width.index_of_time(start.time()))
            }
            _ => None,
        })
        .max()
}
