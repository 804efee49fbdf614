/// Capacity resolution for the history log.
use std::rc::Rc;

use crate::cell::ObservableCell;

/// Smallest capacity a tracker will ever use.
pub const MIN_CAPACITY: usize = 1;

#[derive(Clone)]
enum Source {
    Fixed(usize),
    Dynamic(Rc<dyn Fn() -> usize>),
    Cell(ObservableCell<usize>),
}

/// Maximum number of records a history log may hold.
///
/// The value is re-read every time it is needed, so a closure or a cell can
/// change the bound while the tracker is alive. A resolved value of zero is
/// clamped to [`MIN_CAPACITY`].
#[derive(Clone)]
pub struct Capacity {
    source: Source,
}

impl std::fmt::Debug for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.source {
            Source::Fixed(_) => "fixed",
            Source::Dynamic(_) => "dynamic",
            Source::Cell(_) => "cell",
        };
        f.debug_struct("Capacity")
            .field("kind", &kind)
            .field("current", &self.resolve())
            .finish()
    }
}

impl Capacity {
    /// A constant capacity.
    pub fn fixed(capacity: usize) -> Self {
        Self {
            source: Source::Fixed(capacity),
        }
    }

    /// A capacity computed by `f` each time it is resolved.
    pub fn from_fn(f: impl Fn() -> usize + 'static) -> Self {
        Self {
            source: Source::Dynamic(Rc::new(f)),
        }
    }

    /// A capacity read from `cell`. Trackers subscribe to the cell and trim
    /// their log as soon as it shrinks.
    pub fn from_cell(cell: ObservableCell<usize>) -> Self {
        Self {
            source: Source::Cell(cell),
        }
    }

    /// Evaluates the current capacity, never less than [`MIN_CAPACITY`].
    pub fn resolve(&self) -> usize {
        let raw = match &self.source {
            Source::Fixed(n) => *n,
            Source::Dynamic(f) => f(),
            Source::Cell(cell) => cell.get(),
        };
        if raw < MIN_CAPACITY {
            tracing::warn!("History capacity resolved to {raw}, clamping to {MIN_CAPACITY}");
            return MIN_CAPACITY;
        }
        raw
    }

    /// The backing cell, when the capacity is observable.
    pub fn cell(&self) -> Option<&ObservableCell<usize>> {
        match &self.source {
            Source::Cell(cell) => Some(cell),
            _ => None,
        }
    }
}

impl From<usize> for Capacity {
    fn from(capacity: usize) -> Self {
        Self::fixed(capacity)
    }
}

impl From<ObservableCell<usize>> for Capacity {
    fn from(cell: ObservableCell<usize>) -> Self {
        Self::from_cell(cell)
    }
}
