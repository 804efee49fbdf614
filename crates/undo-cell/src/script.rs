/// Scripted replay of writes, undos, and redos against a tracked cell.
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use undo_cell_mod_history::{HistoryTracker, ObservableCell, Record, TrackerState};

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `set=VALUE`: write a new value into the cell.
    Set(String),
    Undo,
    Redo,
    /// `cap=N`: change the history capacity.
    Capacity(usize),
    Clear,
    /// Print the intermediate state.
    Show,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(value) = s.strip_prefix("set=") {
            return Ok(Step::Set(value.to_string()));
        }
        if let Some(raw) = s.strip_prefix("cap=") {
            let n = raw
                .parse::<usize>()
                .with_context(|| format!("Invalid capacity in step '{s}'"))?;
            return Ok(Step::Capacity(n));
        }
        match s {
            "undo" => Ok(Step::Undo),
            "redo" => Ok(Step::Redo),
            "clear" => Ok(Step::Clear),
            "show" => Ok(Step::Show),
            _ => bail!("Unknown step '{s}' (expected set=VALUE, undo, redo, cap=N, clear, show)"),
        }
    }
}

/// Parses every step, failing on the first invalid one.
pub fn parse_steps(raw: &[String]) -> Result<Vec<Step>> {
    raw.iter()
        .enumerate()
        .map(|(i, s)| {
            s.parse::<Step>()
                .with_context(|| format!("Step {} could not be parsed", i + 1))
        })
        .collect()
}

/// Point-in-time view of a session, printable as text or JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub value: String,
    pub capacity: usize,
    pub state: &'static str,
    pub history: Vec<Record<String>>,
}

impl Snapshot {
    /// Renders the snapshot as human-readable lines.
    pub fn to_text(&self, show_timestamps: bool) -> String {
        let mut out = format!(
            "value: {:?} (state: {}, capacity: {})\n",
            self.value, self.state, self.capacity
        );
        if self.history.is_empty() {
            out.push_str("history: (empty)\n");
            return out;
        }
        out.push_str("history (newest first):\n");
        for (i, record) in self.history.iter().enumerate() {
            let line = if show_timestamps {
                format!("  {i}: {:?} @ {}\n", record.value, record.timestamp)
            } else {
                format!("  {i}: {:?}\n", record.value)
            };
            out.push_str(&line);
        }
        out
    }
}

/// A string cell with a tracker whose capacity lives in its own cell.
pub struct Session {
    cell: ObservableCell<String>,
    capacity: ObservableCell<usize>,
    tracker: HistoryTracker<String>,
}

impl Session {
    pub fn new(initial: String, capacity: usize) -> Self {
        let cell = ObservableCell::new(initial);
        let capacity = ObservableCell::new(capacity);
        let tracker = HistoryTracker::new(cell.clone(), capacity.clone());
        Self {
            cell,
            capacity,
            tracker,
        }
    }

    /// Applies `step`. Returns a snapshot for `Step::Show`.
    pub fn apply(&self, step: &Step) -> Option<Snapshot> {
        match step {
            Step::Set(value) => self.cell.set(value.clone()),
            Step::Undo => {
                if !self.tracker.undo() {
                    tracing::info!("Nothing to undo");
                }
            }
            Step::Redo => {
                if !self.tracker.redo() {
                    tracing::info!("Nothing to redo");
                }
            }
            Step::Capacity(n) => self.capacity.set(*n),
            Step::Clear => self.tracker.clear(),
            Step::Show => return Some(self.snapshot()),
        }
        None
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = match self.tracker.state() {
            TrackerState::Idle => "idle",
            TrackerState::Undone => "undone",
        };
        Snapshot {
            value: self.cell.get(),
            capacity: self.tracker.capacity(),
            state,
            history: self.tracker.history(),
        }
    }
}
