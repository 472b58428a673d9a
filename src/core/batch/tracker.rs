use crate::core::error::{MapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerState {
    Running { completed: usize, total: usize },
    Completed,
}

/// What a recorded completion did to the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Still waiting on this many completions.
    Pending(usize),
    /// That was the last one. Reported exactly once.
    Complete,
}

/// Counts completions against the batch size.
#[derive(Debug)]
pub struct Tracker {
    state: TrackerState,
}

impl Tracker {
    /// A tracker for zero items starts out running and completes on `close_empty`.
    pub fn new(total: usize) -> Self {
        Tracker {
            state: TrackerState::Running {
                completed: 0,
                total,
            },
        }
    }

    pub fn record_completion(&mut self) -> Result<Progress> {
        match self.state {
            TrackerState::Completed => {
                log::error!("completion recorded on a finished batch");
                Err(MapError::AlreadyComplete)
            }
            TrackerState::Running { completed, total } => {
                let completed = completed + 1;
                if completed > total {
                    // Only reachable for an empty batch.
                    self.state = TrackerState::Completed;
                    return Err(MapError::AlreadyComplete);
                }
                if completed == total {
                    self.state = TrackerState::Completed;
                    Ok(Progress::Complete)
                } else {
                    self.state = TrackerState::Running { completed, total };
                    Ok(Progress::Pending(total - completed))
                }
            }
        }
    }

    /// Completes a zero-item batch without any recorded completion.
    pub fn close_empty(&mut self) -> Result<()> {
        match self.state {
            TrackerState::Running {
                completed: 0,
                total: 0,
            } => {
                self.state = TrackerState::Completed;
                Ok(())
            }
            _ => Err(MapError::AlreadyComplete),
        }
    }

    pub fn completed(&self) -> Option<usize> {
        match self.state {
            TrackerState::Running { completed, .. } => Some(completed),
            TrackerState::Completed => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == TrackerState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_completes_on_last() {
        let mut tracker = Tracker::new(3);
        assert_eq!(tracker.record_completion(), Ok(Progress::Pending(2)));
        assert_eq!(tracker.record_completion(), Ok(Progress::Pending(1)));
        assert_eq!(tracker.completed(), Some(2));
        assert_eq!(tracker.record_completion(), Ok(Progress::Complete));
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_tracker_is_inert_after_completion() {
        let mut tracker = Tracker::new(1);
        assert_eq!(tracker.record_completion(), Ok(Progress::Complete));
        assert_eq!(tracker.record_completion(), Err(MapError::AlreadyComplete));
        assert_eq!(tracker.record_completion(), Err(MapError::AlreadyComplete));
    }

    #[test]
    fn test_tracker_empty_batch() {
        let mut tracker = Tracker::new(0);
        assert!(!tracker.is_complete());
        tracker.close_empty().unwrap();
        assert!(tracker.is_complete());
        assert_eq!(tracker.close_empty(), Err(MapError::AlreadyComplete));
        assert_eq!(tracker.record_completion(), Err(MapError::AlreadyComplete));
    }

    #[test]
    fn test_tracker_close_empty_rejected_for_non_empty() {
        let mut tracker = Tracker::new(2);
        assert_eq!(tracker.close_empty(), Err(MapError::AlreadyComplete));
        assert!(!tracker.is_complete());
    }
}
