/// Bounded undo/redo history for a single observable value.
///
/// Provides an `ObservableCell` that notifies subscribers with the old and
/// new value on every write, and a `HistoryTracker` that records superseded
/// values into a capacity-bounded, newest-first log which can be rewound
/// (undo) and replayed (redo).
pub mod capacity;
pub mod cell;
pub mod config;
pub mod record;
pub mod tracker;

pub use capacity::Capacity;
pub use cell::{ObservableCell, Subscription};
pub use config::HistoryConfig;
pub use record::Record;
pub use tracker::{HistoryTracker, TrackerState};
