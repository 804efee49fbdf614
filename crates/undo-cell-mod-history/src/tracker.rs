/// Bounded undo/redo tracker for a single observable value.
///
/// The tracker registers a write hook on its source cell, so each change is
/// recorded inside the write itself, before any queued subscriber can react
/// to it (for example by calling `undo`). Every change pushes the superseded
/// value to the front of a newest-first log, clears the redo slot, and trims
/// the log to the current capacity. `undo` and `redo` write
/// back into the source through a path that skips the tracker's own
/// subscription, so restoring a value is never recorded as a new change.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::capacity::Capacity;
use crate::cell::{ObservableCell, Subscription};
use crate::config::HistoryConfig;
use crate::record::Record;

/// Whether a redo is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Nothing to redo.
    Idle,
    /// The last `undo` left one value in the redo slot.
    Undone,
}

struct TrackerInner<T> {
    /// Superseded values, newest first.
    log: VecDeque<Record<T>>,
    /// Value displaced by the most recent undo.
    redo: Option<T>,
    /// Whether source changes are recorded (host-controlled).
    recording: bool,
}

impl<T> TrackerInner<T> {
    /// Drops the oldest records until the log fits `capacity`.
    fn truncate(&mut self, capacity: usize) {
        if self.log.len() > capacity {
            let dropped = self.log.len() - capacity;
            self.log.truncate(capacity);
            tracing::debug!("Dropped {dropped} oldest history records (capacity {capacity})");
        }
    }

    fn push_front(&mut self, value: T, capacity: usize) {
        self.log.push_front(Record::new(value));
        self.truncate(capacity);
    }
}

/// Tracks the history of one `ObservableCell`.
///
/// Dropping the tracker unsubscribes it from the source (and from the
/// capacity cell, if any); the source keeps its current value.
pub struct HistoryTracker<T: Clone + PartialEq + 'static> {
    source: ObservableCell<T>,
    capacity: Capacity,
    inner: Rc<RefCell<TrackerInner<T>>>,
    /// Kept alive for as long as the tracker; also identifies the tracker's
    /// own writes so they are not delivered back to it.
    source_sub: Subscription,
    _capacity_sub: Option<Subscription>,
}

impl<T: Clone + PartialEq + 'static> std::fmt::Debug for HistoryTracker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("HistoryTracker")
            .field("log_len", &inner.log.len())
            .field("redo_pending", &inner.redo.is_some())
            .field("recording", &inner.recording)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> HistoryTracker<T> {
    /// Starts tracking `source` with an empty log.
    ///
    /// The current value of `source` is not recorded; only values it is
    /// replaced by later produce history.
    pub fn new(source: ObservableCell<T>, capacity: impl Into<Capacity>) -> Self {
        let capacity = capacity.into();
        let inner = Rc::new(RefCell::new(TrackerInner {
            log: VecDeque::new(),
            redo: None,
            recording: true,
        }));

        let source_sub = {
            let weak: Weak<RefCell<TrackerInner<T>>> = Rc::downgrade(&inner);
            let capacity = capacity.clone();
            source.on_write(move |old: &T, _new: &T| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.borrow().recording {
                    return;
                }
                let limit = capacity.resolve();
                let mut inner = inner.borrow_mut();
                inner.push_front(old.clone(), limit);
                inner.redo = None;
                tracing::debug!("Recorded change, history length {}", inner.log.len());
            })
        };

        // Growing never restores dropped records; shrinking trims right away.
        let capacity_sub = capacity.cell().map(|cell| {
            let weak = Rc::downgrade(&inner);
            let capacity = capacity.clone();
            cell.subscribe(move |_old: &usize, _new: &usize| {
                if let Some(inner) = weak.upgrade() {
                    let limit = capacity.resolve();
                    inner.borrow_mut().truncate(limit);
                }
            })
        });

        Self {
            source,
            capacity,
            inner,
            source_sub,
            _capacity_sub: capacity_sub,
        }
    }

    /// Starts tracking `source` with the configured default capacity.
    pub fn with_config(source: ObservableCell<T>, config: &HistoryConfig) -> Self {
        Self::new(source, Capacity::fixed(config.default_capacity))
    }

    /// The tracked cell.
    pub fn source(&self) -> &ObservableCell<T> {
        &self.source
    }

    /// Snapshot of the log, newest first.
    pub fn history(&self) -> Vec<Record<T>> {
        self.inner.borrow().log.iter().cloned().collect()
    }

    /// Gives `f` a borrowed view of the log, newest first.
    ///
    /// `f` must not call back into this tracker.
    pub fn with_history<R>(&self, f: impl FnOnce(&VecDeque<Record<T>>) -> R) -> R {
        f(&self.inner.borrow().log)
    }

    /// The most recently superseded value, if any.
    pub fn latest(&self) -> Option<Record<T>> {
        self.inner.borrow().log.front().cloned()
    }

    /// Number of records in the log.
    pub fn len(&self) -> usize {
        self.inner.borrow().log.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().log.is_empty()
    }

    /// The capacity as currently resolved.
    pub fn capacity(&self) -> usize {
        self.capacity.resolve()
    }

    /// Current position in the undo/redo state machine.
    pub fn state(&self) -> TrackerState {
        if self.inner.borrow().redo.is_some() {
            TrackerState::Undone
        } else {
            TrackerState::Idle
        }
    }

    /// Whether `undo` would do anything.
    pub fn can_undo(&self) -> bool {
        !self.is_empty()
    }

    /// Whether `redo` would do anything.
    pub fn can_redo(&self) -> bool {
        self.inner.borrow().redo.is_some()
    }

    /// Restores the most recently superseded value.
    ///
    /// The current value moves into the redo slot, replacing whatever was
    /// there. Returns `false` (and changes nothing) if the log is empty.
    pub fn undo(&self) -> bool {
        let previous = {
            let mut inner = self.inner.borrow_mut();
            let Some(record) = inner.log.pop_front() else {
                return false;
            };
            inner.redo = Some(self.source.get());
            tracing::debug!("Undo, history length {}", inner.log.len());
            record.value
        };
        self.source.set_skipping(previous, &self.source_sub);
        true
    }

    /// Re-applies the value displaced by the last `undo`.
    ///
    /// The current value goes back to the front of the log. Returns `false`
    /// (and changes nothing) if there is nothing to redo.
    pub fn redo(&self) -> bool {
        let limit = self.capacity.resolve();
        let next = {
            let mut inner = self.inner.borrow_mut();
            let Some(next) = inner.redo.take() else {
                return false;
            };
            inner.push_front(self.source.get(), limit);
            tracing::debug!("Redo, history length {}", inner.log.len());
            next
        };
        self.source.set_skipping(next, &self.source_sub);
        true
    }

    /// Re-resolves the capacity and drops records that no longer fit.
    ///
    /// Cell-backed capacities trigger this automatically; closure-backed
    /// ones need the host to call it when the closure's inputs change.
    pub fn trim(&self) {
        let limit = self.capacity.resolve();
        self.inner.borrow_mut().truncate(limit);
    }

    /// Empties the log and the redo slot. The source value is untouched.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.log.clear();
        inner.redo = None;
    }

    /// Stops recording source changes until `resume_recording`.
    pub fn pause_recording(&self) {
        self.inner.borrow_mut().recording = false;
    }

    /// Resumes recording after a pause.
    pub fn resume_recording(&self) {
        self.inner.borrow_mut().recording = true;
    }

    /// Whether source changes are currently recorded.
    pub fn is_recording(&self) -> bool {
        self.inner.borrow().recording
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn values<T: Clone + PartialEq + 'static>(tracker: &HistoryTracker<T>) -> Vec<T> {
        tracker.history().into_iter().map(|r| r.value).collect()
    }

    fn tracked(initial: i32, capacity: usize) -> (ObservableCell<i32>, HistoryTracker<i32>) {
        let cell = ObservableCell::new(initial);
        let tracker = HistoryTracker::new(cell.clone(), capacity);
        (cell, tracker)
    }

    // --- Recording ---

    #[test]
    fn test_new_tracker_is_empty() {
        let (_cell, tracker) = tracked(0, 10);
        assert!(tracker.is_empty());
        assert_eq!(tracker.len(), 0);
        assert!(!tracker.can_undo());
        assert!(!tracker.can_redo());
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(tracker.latest().is_none());
    }

    #[test]
    fn test_records_superseded_values_newest_first() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);
        cell.set(2);
        cell.set(3);
        assert_eq!(values(&tracker), vec![2, 1, 0]);
        assert_eq!(tracker.latest().map(|r| r.value), Some(2));
    }

    #[test]
    fn test_live_value_not_in_log() {
        let (cell, tracker) = tracked(0, 10);
        for v in 1..=4 {
            cell.set(v);
            assert!(!values(&tracker).contains(&cell.get()));
        }
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let (cell, tracker) = tracked(0, 3);
        for v in 1..=5 {
            cell.set(v);
        }
        assert_eq!(values(&tracker), vec![4, 3, 2]);
    }

    #[test]
    fn test_equal_write_not_recorded() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_timestamps_non_decreasing_towards_front() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);
        cell.set(2);
        let history = tracker.history();
        assert!(history[0].timestamp >= history[1].timestamp);
    }

    // --- Undo / redo ---

    #[test]
    fn test_undo_redo_basic() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);

        assert!(tracker.undo());
        assert_eq!(cell.get(), 0);
        assert!(tracker.is_empty());
        assert_eq!(tracker.state(), TrackerState::Undone);

        assert!(tracker.redo());
        assert_eq!(cell.get(), 1);
        assert_eq!(values(&tracker), vec![0]);
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn test_undo_empty_is_noop() {
        let (cell, tracker) = tracked(5, 10);
        assert!(!tracker.undo());
        assert_eq!(cell.get(), 5);
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn test_redo_empty_is_noop() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);
        assert!(!tracker.redo());
        assert_eq!(cell.get(), 1);
        assert_eq!(values(&tracker), vec![0]);
    }

    #[test]
    fn test_undo_write_is_not_recorded() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);
        cell.set(2);
        let version = cell.version();

        tracker.undo();
        assert_eq!(cell.version(), version + 1);
        assert_eq!(values(&tracker), vec![0]);
        assert_eq!(cell.get(), 1);
    }

    #[test]
    fn test_redo_is_single_use() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);
        tracker.undo();
        assert!(tracker.redo());
        assert!(!tracker.redo());
        assert_eq!(cell.get(), 1);
    }

    #[test]
    fn test_new_write_clears_redo() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);
        cell.set(2);
        tracker.undo();
        assert!(tracker.can_redo());

        cell.set(7);
        assert!(!tracker.can_redo());
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(!tracker.redo());
        assert_eq!(cell.get(), 7);
        assert_eq!(values(&tracker), vec![1, 0]);
    }

    #[test]
    fn test_second_undo_replaces_redo_slot() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);
        cell.set(2);

        tracker.undo(); // live 1, redo 2
        tracker.undo(); // live 0, redo 1
        assert_eq!(cell.get(), 0);
        assert_eq!(tracker.state(), TrackerState::Undone);

        assert!(tracker.redo());
        assert_eq!(cell.get(), 1);
        assert!(!tracker.redo());
        assert_eq!(values(&tracker), vec![0]);
    }

    #[test]
    fn test_redo_respects_capacity() {
        let capacity = Rc::new(Cell::new(3));
        let capacity_clone = Rc::clone(&capacity);
        let cell = ObservableCell::new(0);
        let tracker = HistoryTracker::new(
            cell.clone(),
            Capacity::from_fn(move || capacity_clone.get()),
        );
        for v in 1..=3 {
            cell.set(v);
        }
        tracker.undo(); // log [1, 0], live 2

        capacity.set(1);
        assert!(tracker.redo());
        assert_eq!(values(&tracker), vec![2]);
        assert_eq!(cell.get(), 3);
    }

    // --- Capacity changes ---

    #[test]
    fn test_capacity_cell_shrink_truncates_immediately() {
        let cap = ObservableCell::new(5usize);
        let cell = ObservableCell::new(0);
        let tracker = HistoryTracker::new(cell.clone(), cap.clone());
        for v in 1..=5 {
            cell.set(v);
        }
        assert_eq!(tracker.len(), 5);

        cap.set(2);
        assert_eq!(values(&tracker), vec![4, 3]);

        cap.set(10);
        assert_eq!(values(&tracker), vec![4, 3]);
        assert_eq!(tracker.capacity(), 10);
    }

    #[test]
    fn test_trim_with_closure_capacity() {
        let limit = Rc::new(Cell::new(4));
        let limit_clone = Rc::clone(&limit);
        let cell = ObservableCell::new(0);
        let tracker =
            HistoryTracker::new(cell.clone(), Capacity::from_fn(move || limit_clone.get()));
        for v in 1..=4 {
            cell.set(v);
        }

        limit.set(1);
        assert_eq!(tracker.len(), 4);
        tracker.trim();
        assert_eq!(values(&tracker), vec![3]);
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        let (cell, tracker) = tracked(0, 0);
        cell.set(1);
        cell.set(2);
        assert_eq!(values(&tracker), vec![1]);
        assert_eq!(tracker.capacity(), 1);
    }

    // --- Recording control and lifecycle ---

    #[test]
    fn test_pause_recording() {
        let (cell, tracker) = tracked(0, 10);
        tracker.pause_recording();
        assert!(!tracker.is_recording());
        cell.set(1);
        assert!(tracker.is_empty());

        tracker.resume_recording();
        cell.set(2);
        assert_eq!(values(&tracker), vec![1]);
    }

    #[test]
    fn test_clear() {
        let (cell, tracker) = tracked(0, 10);
        cell.set(1);
        cell.set(2);
        tracker.undo();
        tracker.clear();
        assert!(tracker.is_empty());
        assert!(!tracker.can_redo());
        assert_eq!(cell.get(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let cell = ObservableCell::new(0);
        {
            let _tracker = HistoryTracker::new(cell.clone(), 5usize);
            assert_eq!(cell.subscriber_count(), 1);
        }
        cell.set(1);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn test_other_subscribers_see_undo() {
        let (cell, tracker) = tracked(0, 10);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = cell.subscribe(move |old: &i32, new: &i32| {
            seen_clone.borrow_mut().push((*old, *new));
        });

        cell.set(1);
        tracker.undo();
        tracker.redo();
        assert_eq!(*seen.borrow(), vec![(0, 1), (1, 0), (0, 1)]);
    }

    #[test]
    fn test_with_config_uses_default_capacity() {
        let cell = ObservableCell::new(String::new());
        let config = HistoryConfig { default_capacity: 2 };
        let tracker = HistoryTracker::with_config(cell.clone(), &config);
        for s in ["a", "b", "c"] {
            cell.set(s.to_string());
        }
        assert_eq!(tracker.capacity(), 2);
        assert_eq!(tracker.with_history(|log| log.len()), 2);
    }

    #[test]
    fn test_debug_does_not_panic() {
        let (cell, tracker) = tracked(0, 3);
        cell.set(1);
        let text = format!("{tracker:?}");
        assert!(text.contains("log_len: 1"));
    }
}
