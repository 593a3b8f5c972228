use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::frame::Frame;

const IDLE: u8 = 0;
const BUSY: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InferenceState {
    Idle,
    Busy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStats {
    pub delivered: u64,
    pub admitted: u64,
    pub skipped_interval: u64,
    pub skipped_busy: u64,
}

#[derive(Debug)]
struct GateShared {
    interval: u32,
    counter: AtomicU32,
    state: AtomicU8,
    delivered: AtomicU64,
    admitted: AtomicU64,
    skipped_interval: AtomicU64,
    skipped_busy: AtomicU64,
}

/// Decides which delivered frames reach the detector.
///
/// Every delivered frame advances the interval counter, including frames
/// that are then dropped because an inference is still running. A frame is
/// admitted only when the counter wraps *and* the guard moves `Idle -> Busy`.
#[derive(Debug, Clone)]
pub struct FrameGate {
    shared: Arc<GateShared>,
}

/// Result of offering one frame to the gate.
#[derive(Debug)]
pub enum Admission {
    Admitted(InferencePermit),
    SkippedInterval,
    SkippedBusy,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// Exclusive right to run one inference. Holds the in-flight frame; the
/// guard returns to `Idle` when the permit is dropped, on every path.
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the inference slot"]
pub struct InferencePermit {
    shared: Arc<GateShared>,
    frame: Frame,
}

impl InferencePermit {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for InferencePermit {
    fn drop(&mut self) {
        self.shared.state.store(IDLE, Ordering::Release);
    }
}

impl FrameGate {
    /// `frame_interval` of 0 is treated as 1 (admit every frame).
    pub fn new(frame_interval: u32) -> Self {
        Self {
            shared: Arc::new(GateShared {
                interval: frame_interval.max(1),
                counter: AtomicU32::new(0),
                state: AtomicU8::new(IDLE),
                delivered: AtomicU64::new(0),
                admitted: AtomicU64::new(0),
                skipped_interval: AtomicU64::new(0),
                skipped_busy: AtomicU64::new(0),
            }),
        }
    }

    pub fn interval(&self) -> u32 {
        self.shared.interval
    }

    /// Non-blocking: never waits on the in-flight inference.
    pub fn on_frame(&self, frame: Frame) -> Admission {
        let shared = &self.shared;
        shared.delivered.fetch_add(1, Ordering::Relaxed);

        let interval = shared.interval;
        let previous = shared
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                let next = count + 1;
                Some(if next >= interval { 0 } else { next })
            })
            .unwrap_or_else(|count| count);

        if previous + 1 < interval {
            shared.skipped_interval.fetch_add(1, Ordering::Relaxed);
            return Admission::SkippedInterval;
        }

        match shared
            .state
            .compare_exchange(IDLE, BUSY, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                shared.admitted.fetch_add(1, Ordering::Relaxed);
                Admission::Admitted(InferencePermit {
                    shared: Arc::clone(shared),
                    frame,
                })
            }
            Err(_) => {
                shared.skipped_busy.fetch_add(1, Ordering::Relaxed);
                Admission::SkippedBusy
            }
        }
    }

    pub fn state(&self) -> InferenceState {
        match self.shared.state.load(Ordering::Acquire) {
            IDLE => InferenceState::Idle,
            _ => InferenceState::Busy,
        }
    }

    pub fn stats(&self) -> GateStats {
        let shared = &self.shared;
        GateStats {
            delivered: shared.delivered.load(Ordering::Relaxed),
            admitted: shared.admitted.load(Ordering::Relaxed),
            skipped_interval: shared.skipped_interval.load(Ordering::Relaxed),
            skipped_busy: shared.skipped_busy.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn frame(sequence: u64) -> Frame {
        Frame::new(sequence, RgbaImage::new(1, 1))
    }

    #[test]
    fn admits_exactly_one_of_every_n_frames_when_idle() {
        for interval in 1..=12u32 {
            let gate = FrameGate::new(interval);
            let mut admitted = Vec::new();
            for sequence in 0..(interval as u64 * 20) {
                if let Admission::Admitted(permit) = gate.on_frame(frame(sequence)) {
                    admitted.push(permit.frame().sequence);
                    // Dropping the permit completes the inference immediately.
                }
            }
            assert_eq!(admitted.len(), 20, "interval {interval}");
            for (i, sequence) in admitted.iter().enumerate() {
                assert_eq!(*sequence, (i as u64 + 1) * interval as u64 - 1);
            }
            let stats = gate.stats();
            assert_eq!(stats.delivered, interval as u64 * 20);
            assert_eq!(stats.skipped_busy, 0);
        }
    }

    #[test]
    fn zero_interval_admits_every_frame() {
        let gate = FrameGate::new(0);
        assert_eq!(gate.interval(), 1);
        assert!(gate.on_frame(frame(0)).is_admitted());
        assert!(gate.on_frame(frame(1)).is_admitted());
    }

    #[test]
    fn busy_gate_drops_frames_until_permit_is_released() {
        let gate = FrameGate::new(1);
        let permit = match gate.on_frame(frame(0)) {
            Admission::Admitted(permit) => permit,
            other => panic!("expected admission, got {other:?}"),
        };
        assert_eq!(gate.state(), InferenceState::Busy);

        for sequence in 1..5 {
            assert!(matches!(gate.on_frame(frame(sequence)), Admission::SkippedBusy));
        }

        drop(permit);
        assert_eq!(gate.state(), InferenceState::Idle);
        assert!(gate.on_frame(frame(5)).is_admitted());

        let stats = gate.stats();
        assert_eq!(stats.admitted, 2);
        assert_eq!(stats.skipped_busy, 4);
    }

    #[test]
    fn interval_counter_keeps_counting_while_busy() {
        let gate = FrameGate::new(3);
        // Frames 0,1 skip on interval; frame 2 is admitted and stays in flight.
        assert!(matches!(gate.on_frame(frame(0)), Admission::SkippedInterval));
        assert!(matches!(gate.on_frame(frame(1)), Admission::SkippedInterval));
        let permit = match gate.on_frame(frame(2)) {
            Admission::Admitted(permit) => permit,
            other => panic!("expected admission, got {other:?}"),
        };
        // Frame 5 reaches the interval but the guard is busy; the counter
        // still resets, so frame 6 is an interval skip after release.
        assert!(matches!(gate.on_frame(frame(3)), Admission::SkippedInterval));
        assert!(matches!(gate.on_frame(frame(4)), Admission::SkippedInterval));
        assert!(matches!(gate.on_frame(frame(5)), Admission::SkippedBusy));
        drop(permit);
        assert!(matches!(gate.on_frame(frame(6)), Admission::SkippedInterval));
        assert!(matches!(gate.on_frame(frame(7)), Admission::SkippedInterval));
        assert!(gate.on_frame(frame(8)).is_admitted());
    }

    #[test]
    fn permit_release_survives_a_panicking_holder() {
        let gate = FrameGate::new(1);
        let admission = gate.on_frame(frame(0));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = admission;
            panic!("detector blew up");
        }));
        assert!(result.is_err());
        assert_eq!(gate.state(), InferenceState::Idle);
    }
}
