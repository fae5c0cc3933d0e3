use std::collections::HashMap;

use crate::model::{DownloadTaskState, ProgressEvent, ProgressKind, TaskStatus};
use crate::progress::format_eta;

/// Receives progress events from download tasks and keeps the per-row state
/// table the grid renders from.
///
/// Only the interactive thread mutates this; tasks hand events over through a
/// channel. Every event carries the fetch generation its task was launched
/// under, and events from a superseded generation are dropped so that no
/// progress is ever attributed to a row that now means something else.
#[derive(Debug, Default)]
pub struct ProgressSink {
    generation: u64,
    rows: HashMap<usize, DownloadTaskState>,
}

/// What `apply` did with an event, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// Event belonged to a superseded fetch
    Stale,
    /// Duplicate terminal or a progress line after the terminal event
    Ignored,
}

impl ProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Discards all task state and moves to a new fetch generation. Called
    /// before a new `FetchResult` is installed.
    pub fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.rows.clear();
    }

    /// Registers a freshly launched task as `Pending` for `row`.
    pub fn begin(&mut self, row: usize) {
        self.rows.insert(row, DownloadTaskState::pending(row));
    }

    /// Applies one event to the state table.
    pub fn apply(&mut self, event: ProgressEvent) -> Applied {
        if event.generation != self.generation {
            return Applied::Stale;
        }
        let Some(state) = self.rows.get_mut(&event.row) else {
            // No task was launched for this row under the current generation.
            return Applied::Ignored;
        };

        match event.kind {
            ProgressKind::Downloading { percent, speed, eta } => {
                if state.status.is_terminal() {
                    // Late line that crossed the terminal event on the channel.
                    return Applied::Ignored;
                }
                state.status = TaskStatus::Running;
                if percent >= state.percent {
                    state.percent = percent;
                }
                state.speed = speed;
                state.eta = format_eta(eta);
                Applied::Updated
            }
            ProgressKind::Finished => {
                if state.status.is_terminal() {
                    return Applied::Ignored;
                }
                state.status = TaskStatus::Succeeded;
                state.percent = 100.0;
                state.speed.clear();
                state.eta = format_eta(None);
                Applied::Updated
            }
            ProgressKind::Failed(message) => {
                if state.status.is_terminal() {
                    return Applied::Ignored;
                }
                state.status = TaskStatus::Failed;
                state.error = Some(message);
                Applied::Updated
            }
        }
    }

    pub fn get(&self, row: usize) -> Option<&DownloadTaskState> {
        self.rows.get(&row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True while any launched task has not reached a terminal state.
    pub fn has_active_tasks(&self) -> bool {
        self.rows.values().any(|s| !s.status.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloading(generation: u64, row: usize, percent: f32, eta: Option<u64>) -> ProgressEvent {
        ProgressEvent {
            generation,
            row,
            kind: ProgressKind::Downloading {
                percent,
                speed: "1.00MiB/s".into(),
                eta,
            },
        }
    }

    fn terminal(generation: u64, row: usize, kind: ProgressKind) -> ProgressEvent {
        ProgressEvent { generation, row, kind }
    }

    #[test]
    fn stale_generation_events_are_dropped_without_trace() {
        let mut sink = ProgressSink::new();
        sink.reset(1);
        sink.begin(0);

        // A task from the previous fetch reports in.
        assert_eq!(sink.apply(downloading(0, 0, 80.0, None)), Applied::Stale);
        assert_eq!(sink.apply(terminal(0, 0, ProgressKind::Finished)), Applied::Stale);

        let state = sink.get(0).unwrap();
        assert_eq!(state.status, TaskStatus::Pending);
        assert_eq!(state.percent, 0.0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn finished_is_idempotent() {
        let mut sink = ProgressSink::new();
        sink.reset(1);
        sink.begin(2);

        assert_eq!(sink.apply(terminal(1, 2, ProgressKind::Finished)), Applied::Updated);
        let once = sink.get(2).unwrap().clone();
        assert_eq!(sink.apply(terminal(1, 2, ProgressKind::Finished)), Applied::Ignored);
        let twice = sink.get(2).unwrap();

        assert_eq!(twice.status, once.status);
        assert_eq!(twice.percent, once.percent);
        assert_eq!(twice.percent, 100.0);
    }

    #[test]
    fn progress_after_terminal_is_ignored() {
        let mut sink = ProgressSink::new();
        sink.reset(1);
        sink.begin(0);

        sink.apply(terminal(1, 0, ProgressKind::Finished));
        assert_eq!(sink.apply(downloading(1, 0, 55.0, Some(9))), Applied::Ignored);
        assert_eq!(sink.get(0).unwrap().percent, 100.0);
        assert_eq!(sink.get(0).unwrap().status, TaskStatus::Succeeded);
    }

    #[test]
    fn one_failure_leaves_siblings_untouched() {
        let mut sink = ProgressSink::new();
        sink.reset(1);
        for row in 0..4 {
            sink.begin(row);
        }

        for row in [0, 1, 3] {
            sink.apply(downloading(1, row, 50.0, Some(10)));
            sink.apply(terminal(1, row, ProgressKind::Finished));
        }
        sink.apply(terminal(1, 2, ProgressKind::Failed("HTTP 403".into())));

        let failed: Vec<usize> = (0..4)
            .filter(|&r| sink.get(r).unwrap().status == TaskStatus::Failed)
            .collect();
        assert_eq!(failed, vec![2]);
        assert_eq!(sink.get(2).unwrap().error.as_deref(), Some("HTTP 403"));
        for row in [0, 1, 3] {
            assert_eq!(sink.get(row).unwrap().status, TaskStatus::Succeeded);
        }
    }

    #[test]
    fn events_for_unlaunched_rows_are_ignored() {
        let mut sink = ProgressSink::new();
        sink.reset(1);
        sink.begin(0);

        assert_eq!(sink.apply(downloading(1, 7, 10.0, None)), Applied::Ignored);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn percent_never_regresses_within_a_row() {
        let mut sink = ProgressSink::new();
        sink.reset(1);
        sink.begin(0);

        sink.apply(downloading(1, 0, 60.0, Some(20)));
        sink.apply(downloading(1, 0, 45.0, Some(30)));
        assert_eq!(sink.get(0).unwrap().percent, 60.0);
    }

    // The worked example: three items, all selected, only item b's task
    // reports; rows 0 and 2 stay Pending.
    #[test]
    fn three_item_example() {
        let mut sink = ProgressSink::new();
        sink.reset(1);
        for row in 0..3 {
            sink.begin(row);
        }

        sink.apply(downloading(1, 1, 45.0, Some(120)));
        assert_eq!(sink.get(1).unwrap().status, TaskStatus::Running);
        assert_eq!(sink.get(1).unwrap().eta, "00:02:00");

        sink.apply(terminal(1, 1, ProgressKind::Finished));
        let b = sink.get(1).unwrap();
        assert_eq!(b.status, TaskStatus::Succeeded);
        assert_eq!(b.percent, 100.0);
        assert_eq!(sink.get(0).unwrap().status, TaskStatus::Pending);
        assert_eq!(sink.get(2).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn reset_clears_all_task_state() {
        let mut sink = ProgressSink::new();
        sink.reset(1);
        sink.begin(0);
        sink.apply(downloading(1, 0, 30.0, None));
        assert!(sink.has_active_tasks());

        sink.reset(2);
        assert!(sink.is_empty());
        assert!(!sink.has_active_tasks());
        assert_eq!(sink.generation(), 2);
    }
}
