use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::frame::Frame;

struct Inner {
    frame: Option<Frame>,
    running: bool,
    dropped_frames: u64,
}

/// Single-slot, overwrite-newest handoff between the capture thread and the encoder.
///
/// `push` never blocks the producer: if a frame is already waiting and hasn't been
/// picked up by `wait` yet, it is replaced and `dropped_frames` is incremented. This
/// keeps the capture thread running at the X server's pace regardless of how fast the
/// encoder drains the queue.
///
/// Implemented with a native mutex + condition variable, the direct translation of the
/// `GMutex`/`GCond` pair the original capture pipeline uses for the same handoff.
pub struct FrameQueue {
    state: Mutex<Inner>,
    cond: Condvar,
}

impl FrameQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Inner {
                frame: None,
                running: true,
                dropped_frames: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Restores the queue to its initial, running, empty state. Used when a session
    /// restarts capture after a prior `stop`.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.running = true;
        state.frame = None;
    }

    /// Publishes a newly captured frame, overwriting any frame not yet consumed.
    ///
    /// No-op once the queue has been stopped.
    pub fn push(&self, frame: Frame) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.running {
            return;
        }

        if state.frame.is_some() {
            state.dropped_frames += 1;
        }
        state.frame = Some(frame);
        self.cond.notify_all();
    }

    /// Blocks until a frame is available, the queue is stopped, or `timeout_us` elapses.
    ///
    /// `timeout_us < 0` waits indefinitely; `timeout_us == 0` polls without blocking.
    /// Returns `None` on timeout, on a stopped queue, or if the queue had no frame when
    /// the wait was satisfied by a stop signal.
    pub fn wait(&self, timeout_us: i64) -> Option<Frame> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.running {
            return None;
        }

        if timeout_us == 0 {
            return if state.running { state.frame.take() } else { None };
        }

        if timeout_us < 0 {
            while state.running && state.frame.is_none() {
                state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
            }
        } else {
            let deadline = Instant::now() + Duration::from_micros(timeout_us.unsigned_abs());
            while state.running && state.frame.is_none() {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, timeout_result) = self
                    .cond
                    .wait_timeout(state, deadline - now)
                    .unwrap_or_else(|e| e.into_inner());
                state = guard;
                if timeout_result.timed_out() && state.frame.is_none() {
                    break;
                }
            }
        }

        if state.running {
            state.frame.take()
        } else {
            None
        }
    }

    /// Signals `running = false` and wakes every waiter; subsequent `push`/`wait` calls
    /// are no-ops until `reset`.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.running = false;
        self.cond.notify_all();
    }

    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).dropped_frames
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn frame(ts: i64) -> Frame {
        Frame::new(4, 4, 16, ts, vec![0u8; 64])
    }

    #[rstest]
    #[case(0, 0)]
    #[case(0, 4)]
    #[case(4, 0)]
    fn zero_sized_frame_round_trips_through_the_queue(#[case] width: u32, #[case] height: u32) {
        let q = FrameQueue::new();
        q.push(Frame::new(width, height, 0, 1, Vec::new()));
        let got = q.wait(0).expect("frame available");
        assert_eq!(got.width, width);
        assert_eq!(got.height, height);
        assert!(got.data.is_empty());
    }

    #[test]
    fn push_then_wait_returns_the_frame() {
        let q = FrameQueue::new();
        q.push(frame(1));
        let got = q.wait(-1).expect("frame available");
        assert_eq!(got.capture_timestamp_us, 1);
    }

    #[test]
    fn second_push_before_drain_counts_as_dropped() {
        let q = FrameQueue::new();
        q.push(frame(1));
        q.push(frame(2));
        assert_eq!(q.dropped_frames(), 1);
        let got = q.wait(0).expect("frame available");
        assert_eq!(got.capture_timestamp_us, 2);
    }

    #[test]
    fn wait_zero_without_frame_returns_none_immediately() {
        let q = FrameQueue::new();
        assert!(q.wait(0).is_none());
    }

    #[test]
    fn wait_with_timeout_expires_when_no_frame_arrives() {
        let q = FrameQueue::new();
        assert!(q.wait(5_000).is_none());
    }

    #[test]
    fn stop_wakes_blocked_waiter_with_none() {
        let q = Arc::new(FrameQueue::new());
        let waiter = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.wait(-1))
        };
        thread::sleep(Duration::from_millis(20));
        q.stop();
        assert!(waiter.join().unwrap().is_none());
    }

    #[test]
    fn push_after_stop_is_a_no_op() {
        let q = FrameQueue::new();
        q.stop();
        q.push(frame(1));
        assert!(q.wait(0).is_none());
    }

    #[test]
    fn reset_allows_queue_to_run_again() {
        let q = FrameQueue::new();
        q.stop();
        q.reset();
        q.push(frame(7));
        assert_eq!(q.wait(0).unwrap().capture_timestamp_us, 7);
    }
}
