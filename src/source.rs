//! Sensor source collaborators.
//!
//! The session never polls hardware. It asks a [`SensorSource`] to start or
//! stop delivering, and readings arrive as [`SessionEvent::Sample`]s on
//! whatever channel the host wires up.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::session::SessionEvent;
use crate::types::{ActivityLabel, MotionSample};

/// Something that delivers accelerometer readings once registered.
pub trait SensorSource {
    /// Begin delivering samples.
    fn register(&mut self);

    /// Stop delivering samples. Must be safe to call when not registered.
    fn unregister(&mut self);
}

/// Source for hosts that push samples into the session directly.
///
/// Only tracks registration so the host can mirror it onto real hardware.
#[derive(Debug, Default, Clone)]
pub struct ManualSource {
    registered: bool,
    registrations: u32,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// How many times `register` has been called.
    pub fn registrations(&self) -> u32 {
        self.registrations
    }
}

impl SensorSource for ManualSource {
    fn register(&mut self) {
        self.registered = true;
        self.registrations += 1;
    }

    fn unregister(&mut self) {
        self.registered = false;
    }
}

/// Shape of the synthetic signal.
///
/// A vertical oscillation around gravity with a smaller lateral sway, which
/// is roughly what a phone in a pocket sees during gait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waveform {
    /// Peak vertical deviation from gravity in m/s².
    pub amplitude: f32,
    /// Step cadence in Hz.
    pub frequency_hz: f32,
}

impl Waveform {
    /// A plausible waveform for each activity.
    pub fn for_activity(label: ActivityLabel) -> Self {
        match label {
            ActivityLabel::Stationary => Self {
                amplitude: 0.05,
                frequency_hz: 0.5,
            },
            ActivityLabel::Walking => Self {
                amplitude: 2.0,
                frequency_hz: 1.8,
            },
            ActivityLabel::Stairs => Self {
                amplitude: 3.0,
                frequency_hz: 1.5,
            },
            ActivityLabel::Running => Self {
                amplitude: 7.0,
                frequency_hz: 2.8,
            },
        }
    }

    /// Reading at `t_s` seconds into the stream.
    pub fn sample(&self, timestamp_ms: u64, t_s: f32) -> MotionSample {
        let phase = 2.0 * PI * self.frequency_hz * t_s;
        MotionSample::new(
            timestamp_ms,
            [
                0.3 * self.amplitude * phase.cos(),
                0.1 * self.amplitude * (2.0 * phase).sin(),
                -9.81 + self.amplitude * phase.sin(),
            ],
        )
    }
}

impl Default for Waveform {
    fn default() -> Self {
        Self::for_activity(ActivityLabel::Stationary)
    }
}

/// Deterministic accelerometer stand-in.
///
/// On `register` a background thread emits one sample per `interval` into
/// the session's event channel; `unregister` stops and joins it.
pub struct SyntheticSource {
    tx: Sender<SessionEvent>,
    interval: Duration,
    waveform: Arc<Mutex<Waveform>>,
    worker: Option<(Arc<AtomicBool>, JoinHandle<()>)>,
}

impl SyntheticSource {
    pub fn new(tx: Sender<SessionEvent>, interval: Duration) -> Self {
        Self {
            tx,
            interval,
            waveform: Arc::new(Mutex::new(Waveform::default())),
            worker: None,
        }
    }

    /// Shared handle for changing the signal while the source runs.
    pub fn waveform_handle(&self) -> Arc<Mutex<Waveform>> {
        Arc::clone(&self.waveform)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl SensorSource for SyntheticSource {
    fn register(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let tx = self.tx.clone();
        let waveform = Arc::clone(&self.waveform);
        let interval = self.interval;

        let handle = thread::spawn(move || emit_samples(tx, waveform, interval, flag));
        self.worker = Some((running, handle));
        log::debug!("Synthetic source started ({:?} interval)", interval);
    }

    fn unregister(&mut self) {
        if let Some((running, handle)) = self.worker.take() {
            running.store(false, Ordering::SeqCst);
            if handle.join().is_err() {
                log::warn!("Synthetic source thread panicked");
            }
            log::debug!("Synthetic source stopped");
        }
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.unregister();
    }
}

fn emit_samples(
    tx: Sender<SessionEvent>,
    waveform: Arc<Mutex<Waveform>>,
    interval: Duration,
    running: Arc<AtomicBool>,
) {
    let origin = Instant::now();
    let mut n: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        let shape = match waveform.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        let t_s = n as f32 * interval.as_secs_f32();
        let timestamp_ms = origin.elapsed().as_millis() as u64;

        if tx.send(SessionEvent::Sample(shape.sample(timestamp_ms, t_s))).is_err() {
            log::warn!("Sample channel closed, synthetic source exiting");
            return;
        }
        n += 1;

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}
