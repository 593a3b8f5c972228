use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use image::RgbaImage;

use crate::capture::CameraIntrinsics;

use super::{Detection, Detector};

/// Backend that replays a fixed script of results, one per call. Once the
/// script is exhausted every call returns no detections.
///
/// Also records how many calls overlapped, which is how the single-flight
/// guarantee of the pipeline is checked.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Result<Vec<Detection>, String>>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    hinted_calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Result<Vec<Detection>, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            hinted_calls: AtomicUsize::new(0),
        }
    }

    /// Every call sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn hinted_calls(&self) -> usize {
        self.hinted_calls.load(Ordering::SeqCst)
    }
}

impl Detector for ScriptedDetector {
    fn detect(
        &self,
        _image: &RgbaImage,
        hints: Option<&CameraIntrinsics>,
    ) -> anyhow::Result<Vec<Detection>> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if hints.is_some() {
            self.hinted_calls.fetch_add(1, Ordering::SeqCst);
        }

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let next = {
            let mut script = match self.script.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            script.pop_front()
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match next {
            Some(Ok(detections)) => Ok(detections),
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
