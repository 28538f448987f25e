//! Deferred work: an animation-frame queue and a timer queue.
//!
//! Tasks are data, not closures, so the embedding layer can drive them from
//! `requestAnimationFrame` / `setTimeout` callbacks (or a test can drive them
//! by hand) without the controller holding references into itself.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use framehost_core::{Dimensions, Error, FrameId};

/// A unit of deferred work.
#[derive(Debug)]
pub enum Deferred {
    /// Write clamped dimensions to a frame, restore the page position and
    /// run the resized callback.
    ApplySize {
        frame_id: FrameId,
        dimensions: Dimensions,
        /// Wire type of the triggering message.
        kind: String,
    },
    ShowLightbox,
    HideLightbox,
    CloseUploader,
    /// Hand an error to the page's unhandled-error path.
    Surface(Error),
}

impl Deferred {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ApplySize { .. } => "apply_size",
            Self::ShowLightbox => "show_lightbox",
            Self::HideLightbox => "hide_lightbox",
            Self::CloseUploader => "close_uploader",
            Self::Surface(_) => "surface",
        }
    }
}

/// Both queues. Timers fire in due-time order, ties in scheduling order.
#[derive(Debug, Default)]
pub struct Scheduler {
    animation_frame: VecDeque<Deferred>,
    timers: BinaryHeap<Reverse<(u64, u64)>>,
    timer_tasks: HashMap<u64, Deferred>,
    next_seq: u64,
    now_ms: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` for the next animation frame. Every request is kept;
    /// bursts are not coalesced.
    pub fn request_animation_frame(&mut self, task: Deferred) {
        self.animation_frame.push_back(task);
    }

    /// Queue `task` to run `delay_ms` after the last observed clock reading.
    pub fn set_timeout(&mut self, delay_ms: u64, task: Deferred) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.timers
            .push(Reverse((self.now_ms.saturating_add(delay_ms), seq)));
        self.timer_tasks.insert(seq, task);
    }

    /// Take the tasks queued for this animation frame. Tasks queued while
    /// these run wait for the next frame.
    pub fn take_animation_frame(&mut self) -> Vec<Deferred> {
        self.animation_frame.drain(..).collect()
    }

    /// Advance the clock to `now_ms` and take every timer due by then.
    /// Timers scheduled while these run wait for the next call.
    pub fn take_due_timers(&mut self, now_ms: u64) -> Vec<Deferred> {
        self.observe(now_ms);
        let mut due = Vec::new();
        while let Some(Reverse((at, seq))) = self.timers.peek().copied() {
            if at > self.now_ms {
                break;
            }
            self.timers.pop();
            if let Some(task) = self.timer_tasks.remove(&seq) {
                due.push(task);
            }
        }
        due
    }

    /// Record a clock reading. The clock never moves backwards.
    pub fn observe(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    #[must_use]
    pub fn needs_animation_frame(&self) -> bool {
        !self.animation_frame.is_empty()
    }

    /// Due time of the earliest pending timer.
    #[must_use]
    pub fn next_timer_due(&self) -> Option<u64> {
        self.timers.peek().map(|Reverse((at, _))| *at)
    }

    /// Drop everything pending.
    pub fn clear(&mut self) {
        self.animation_frame.clear();
        self.timers.clear();
        self.timer_tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(tasks: &[Deferred]) -> Vec<&'static str> {
        tasks.iter().map(Deferred::label).collect()
    }

    #[test]
    fn test_animation_frame_keeps_every_request() {
        let mut sched = Scheduler::new();
        for _ in 0..3 {
            sched.request_animation_frame(Deferred::ShowLightbox);
        }
        assert!(sched.needs_animation_frame());
        assert_eq!(sched.take_animation_frame().len(), 3);
        assert!(!sched.needs_animation_frame());
    }

    #[test]
    fn test_timers_fire_in_due_then_schedule_order() {
        let mut sched = Scheduler::new();
        sched.set_timeout(10, Deferred::CloseUploader);
        sched.set_timeout(0, Deferred::ShowLightbox);
        sched.set_timeout(0, Deferred::HideLightbox);

        assert_eq!(sched.next_timer_due(), Some(0));
        assert_eq!(
            labels(&sched.take_due_timers(0)),
            vec!["show_lightbox", "hide_lightbox"]
        );
        assert!(sched.take_due_timers(5).is_empty());
        assert_eq!(labels(&sched.take_due_timers(10)), vec!["close_uploader"]);
        assert_eq!(sched.next_timer_due(), None);
    }

    #[test]
    fn test_zero_delay_is_relative_to_last_clock() {
        let mut sched = Scheduler::new();
        sched.observe(1_000);
        sched.set_timeout(0, Deferred::HideLightbox);
        assert_eq!(sched.next_timer_due(), Some(1_000));
        sched.observe(10);
        assert_eq!(sched.take_due_timers(10).len(), 1);
    }
}
