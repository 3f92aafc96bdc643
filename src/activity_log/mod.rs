pub mod format;
pub mod prune;
pub mod sink;

pub use format::{annotation_line, bin_summary_line, header_line, last_logged_bin, parse_line, ParsedLine};
pub use prune::{PruneReport, PruneSchedule};
pub use sink::{FileLogSink, LineSink, SinkError};
