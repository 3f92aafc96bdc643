pub mod aggregator;
pub mod flusher;
pub mod indexer;

pub use aggregator::{EventAggregator, FinishedBin};
pub use flusher::BinLogFlusher;
pub use indexer::{BinId, BinWidth, InvalidBinWidth, MINUTES_PER_DAY};
