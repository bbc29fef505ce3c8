//! Recording session state machine.
//!
//! Drives every accepted sample through reduce → buffer → statistics →
//! record → persist, one sample at a time.
//!
//! # States
//!
//! - `Idle`: no source registered, samples are rejected.
//! - `Sampling(label)`: each sample is buffered; every time the buffer holds
//!   exactly one window a labeled record is appended and merged into the
//!   store, then the overlap is discarded.
//!
//! The in-memory [`Dataset`] outlives start/stop cycles. A failed persist
//! never drops a record: the persister cursor stays put and the next window
//! (or `stop`) retries everything still pending.

use std::time::SystemTime;

use crate::dataset::Dataset;
use crate::error::{ConfigError, PreconditionViolation, SessionError, StoreError};
use crate::signal;
use crate::source::SensorSource;
use crate::statistics;
use crate::store::{DatasetPersister, DatasetStore};
use crate::types::{ActivityLabel, LabeledRecord, MotionSample};
use crate::window::{SlidingWindowBuffer, WindowConfig};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sampling(ActivityLabel),
}

/// What happened to a single accepted sample.
#[derive(Debug)]
pub enum SampleOutcome {
    /// Buffered, no window completed yet.
    Buffered,
    /// A window completed and was merged into the store.
    Recorded(LabeledRecord),
    /// A window completed and is kept in memory, but the merge failed.
    Unsaved {
        record: LabeledRecord,
        error: StoreError,
    },
}

impl SampleOutcome {
    /// The record produced by this sample, if a window completed.
    pub fn record(&self) -> Option<&LabeledRecord> {
        match self {
            SampleOutcome::Buffered => None,
            SampleOutcome::Recorded(record) => Some(record),
            SampleOutcome::Unsaved { record, .. } => Some(record),
        }
    }
}

/// Input to [`ActivitySession::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Start(ActivityLabel),
    Sample(MotionSample),
    Stop,
    /// End the event loop.
    Shutdown,
}

/// Counters reported by [`ActivitySession::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Sample events received.
    pub samples: u64,
    /// Samples that arrived while idle.
    pub rejected_samples: u64,
    /// Windows that completed and were recorded in memory.
    pub windows: u64,
    /// Persist attempts that failed (per window or on stop).
    pub persist_failures: u64,
    /// Sessions aborted on a windowing contract violation.
    pub aborts: u64,
}

/// Activity recording session.
///
/// Owns the window buffer, the accumulated dataset, the persister and the
/// sensor source for its whole lifetime.
pub struct ActivitySession<S, Src> {
    config: WindowConfig,
    state: SessionState,
    buffer: SlidingWindowBuffer,
    dataset: Dataset,
    persister: DatasetPersister<S>,
    source: Src,
    started_at: Option<SystemTime>,
}

impl<S: DatasetStore, Src: SensorSource> ActivitySession<S, Src> {
    /// Create an idle session. Fails if `config` is not a usable window shape.
    pub fn new(config: WindowConfig, store: S, source: Src) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: SessionState::Idle,
            buffer: SlidingWindowBuffer::new(config),
            dataset: Dataset::new(),
            persister: DatasetPersister::new(store),
            source,
            started_at: None,
        })
    }

    /// Begin (or switch) recording under `label`.
    ///
    /// Any partially filled window is dropped. Completed records stay in the
    /// dataset. The source is only registered when coming from `Idle`.
    pub fn start(&mut self, label: ActivityLabel) {
        match self.state {
            SessionState::Idle => {
                self.source.register();
                log::info!(
                    "Recording {} ({} sample windows, {} overlap)",
                    label,
                    self.config.window_size,
                    self.config.overlap_size
                );
            }
            SessionState::Sampling(previous) => {
                log::info!(
                    "Switching {} -> {}, dropping {} buffered samples",
                    previous,
                    label,
                    self.buffer.len()
                );
            }
        }

        self.buffer.clear();
        self.started_at = Some(SystemTime::now());
        self.state = SessionState::Sampling(label);
    }

    /// Feed one accelerometer reading.
    ///
    /// Rejected with [`SessionError::NotSampling`] while idle. A windowing
    /// contract violation aborts the session (source unregistered, state
    /// `Idle`) and is returned as [`SessionError::Precondition`]. Storage
    /// failures are not errors here; they come back as
    /// [`SampleOutcome::Unsaved`].
    pub fn on_sample(&mut self, x: f32, y: f32, z: f32) -> Result<SampleOutcome, SessionError> {
        let label = match self.state {
            SessionState::Sampling(label) => label,
            SessionState::Idle => return Err(SessionError::NotSampling),
        };

        self.buffer.append(signal::reduce(x, y, z));
        if !self.buffer.is_window_ready() {
            return Ok(SampleOutcome::Buffered);
        }

        match self.complete_window(label) {
            Ok(outcome) => Ok(outcome),
            Err(violation) => {
                self.abort(&violation);
                Err(violation.into())
            }
        }
    }

    /// [`on_sample`](Self::on_sample) for a [`MotionSample`].
    pub fn on_motion_sample(&mut self, sample: &MotionSample) -> Result<SampleOutcome, SessionError> {
        let [x, y, z] = sample.accel;
        self.on_sample(x, y, z)
    }

    fn complete_window(&mut self, label: ActivityLabel) -> Result<SampleOutcome, PreconditionViolation> {
        let window = self.buffer.snapshot_window()?;
        let features = statistics::compute(&window, self.config.window_size)?;
        let record = LabeledRecord::new(features, label);
        self.dataset.push(record);

        log::debug!(
            "Window #{} [{}] min={:.3} max={:.3} mean={:.3} sd={:.3}",
            self.dataset.len(),
            label,
            features.min,
            features.max,
            features.mean,
            features.std_dev
        );

        let outcome = match self.persister.persist(&self.dataset) {
            Ok(_) => SampleOutcome::Recorded(record),
            Err(error) => {
                log::warn!(
                    "Keeping {} records in memory, persist to {} failed: {}",
                    self.persister.pending(&self.dataset),
                    self.persister.store().describe(),
                    error
                );
                SampleOutcome::Unsaved { record, error }
            }
        };

        self.buffer.discard_overlap()?;
        Ok(outcome)
    }

    fn abort(&mut self, violation: &PreconditionViolation) {
        log::error!("Aborting session: {}", violation);
        self.source.unregister();
        self.buffer.clear();
        self.state = SessionState::Idle;
    }

    /// Stop recording.
    ///
    /// No-op from `Idle`. From `Sampling` the source is unregistered, the
    /// partial window is dropped, and records whose earlier persist failed
    /// are merged once more. The session is `Idle` even if that retry fails.
    pub fn stop(&mut self) -> Result<(), StoreError> {
        let label = match self.state {
            SessionState::Idle => return Ok(()),
            SessionState::Sampling(label) => label,
        };

        self.source.unregister();
        self.state = SessionState::Idle;
        let dropped = self.buffer.len();
        self.buffer.clear();

        log::info!(
            "Stopped recording {} ({} records total, {} partial samples dropped)",
            label,
            self.dataset.len(),
            dropped
        );

        let retried = self.persister.persist(&self.dataset)?;
        if retried > 0 {
            log::info!("Merged {} previously unsaved records", retried);
        }
        Ok(())
    }

    /// Consume events in order until `Shutdown` or the end of the stream.
    ///
    /// Samples are handled strictly one after another. A session still
    /// sampling when the loop ends is stopped.
    pub fn run<I>(&mut self, events: I) -> RunSummary
    where
        I: IntoIterator<Item = SessionEvent>,
    {
        let mut summary = RunSummary::default();

        for event in events {
            match event {
                SessionEvent::Start(label) => self.start(label),
                SessionEvent::Sample(sample) => {
                    summary.samples += 1;
                    match self.on_motion_sample(&sample) {
                        Ok(SampleOutcome::Buffered) => {}
                        Ok(SampleOutcome::Recorded(_)) => summary.windows += 1,
                        Ok(SampleOutcome::Unsaved { .. }) => {
                            summary.windows += 1;
                            summary.persist_failures += 1;
                        }
                        Err(SessionError::NotSampling) => {
                            log::trace!("Dropping sample at {} ms, session idle", sample.timestamp_ms);
                            summary.rejected_samples += 1;
                        }
                        Err(SessionError::Precondition(_)) => summary.aborts += 1,
                    }
                }
                SessionEvent::Stop => self.stop_counting(&mut summary),
                SessionEvent::Shutdown => break,
            }
        }

        self.stop_counting(&mut summary);
        log::debug!("Event loop finished: {:?}", summary);
        summary
    }

    fn stop_counting(&mut self, summary: &mut RunSummary) {
        if let Err(e) = self.stop() {
            log::warn!("Persist on stop failed: {}", e);
            summary.persist_failures += 1;
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_sampling(&self) -> bool {
        matches!(self.state, SessionState::Sampling(_))
    }

    /// Label currently being recorded.
    pub fn current_label(&self) -> Option<ActivityLabel> {
        match self.state {
            SessionState::Sampling(label) => Some(label),
            SessionState::Idle => None,
        }
    }

    /// Every record completed since the session was created.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Samples waiting in the current partial window.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Records not yet merged into the store.
    pub fn pending(&self) -> usize {
        self.persister.pending(&self.dataset)
    }

    /// When the current (or last) recording started.
    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn config(&self) -> WindowConfig {
        self.config
    }

    pub fn store(&self) -> &S {
        self.persister.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.persister.store_mut()
    }

    pub fn source(&self) -> &Src {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ManualSource;
    use crate::store::MemoryStore;

    fn session(window: usize, overlap: usize) -> ActivitySession<MemoryStore, ManualSource> {
        let config = WindowConfig::new(window, overlap).unwrap();
        ActivitySession::new(config, MemoryStore::new(), ManualSource::new()).unwrap()
    }

    /// Feed a sample whose magnitude is exactly `value`.
    fn feed(session: &mut ActivitySession<MemoryStore, ManualSource>, value: f32) -> SampleOutcome {
        session.on_sample(0.0, 0.0, value).unwrap()
    }

    #[test]
    fn test_initial_state_is_idle() {
        let s = session(4, 2);
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.dataset().is_empty());
        assert!(!s.source().is_registered());
        assert!(s.started_at().is_none());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = WindowConfig {
            window_size: 4,
            overlap_size: 0,
        };
        let result = ActivitySession::new(config, MemoryStore::new(), ManualSource::new());
        assert!(matches!(result, Err(ConfigError::InvalidOverlap { .. })));
    }

    #[test]
    fn test_four_two_scenario() {
        let mut s = session(4, 2);
        s.start(ActivityLabel::Walking);
        assert!(s.source().is_registered());

        let outcomes: Vec<SampleOutcome> = (1..=6).map(|v| feed(&mut s, v as f32)).collect();
        let completed: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.record().is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(completed, vec![3, 5]);

        let records = s.dataset().records();
        assert_eq!(records.len(), 2);
        let sd = 1.25_f64.sqrt();

        assert_eq!(records[0].features.min, 1.0);
        assert_eq!(records[0].features.max, 4.0);
        assert!((records[0].features.mean - 2.5).abs() < 1e-12);
        assert!((records[0].features.std_dev - sd).abs() < 1e-12);

        assert_eq!(records[1].features.min, 3.0);
        assert_eq!(records[1].features.max, 6.0);
        assert!((records[1].features.mean - 4.5).abs() < 1e-12);
        assert!((records[1].features.std_dev - sd).abs() < 1e-12);

        assert!(records.iter().all(|r| r.activity == ActivityLabel::Walking));
        assert_eq!(s.store().saved().map(Dataset::len), Some(2));
    }

    #[test]
    fn test_default_window_counts() {
        let mut s = ActivitySession::new(WindowConfig::default(), MemoryStore::new(), ManualSource::new())
            .unwrap();
        s.start(ActivityLabel::Running);

        // Magnitude of sample i is exactly i, so each window's extremes name
        // the samples it covers.
        for i in 0..128 {
            feed(&mut s, i as f32);
        }
        assert_eq!(s.dataset().len(), 1);
        assert_eq!(s.buffered(), 64);

        for i in 128..192 {
            feed(&mut s, i as f32);
        }
        assert_eq!(s.dataset().len(), 2);

        let first = s.dataset().records()[0].features;
        let second = s.dataset().records()[1].features;
        assert_eq!((first.min, first.max), (0.0, 127.0));
        // Second window starts at sample 64: samples 64..=127 are shared.
        assert_eq!((second.min, second.max), (64.0, 191.0));
        assert_eq!(second.mean, 127.5);
        assert_eq!(first.std_dev, second.std_dev);
    }

    #[test]
    fn test_sample_while_idle_is_rejected() {
        let mut s = session(4, 2);
        assert_eq!(s.on_sample(1.0, 2.0, 3.0).unwrap_err(), SessionError::NotSampling);
        assert_eq!(s.buffered(), 0);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut s = session(4, 2);
        s.stop().unwrap();
        s.stop().unwrap();
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.store().save_count(), 0);
    }

    #[test]
    fn test_stop_drops_partial_window_and_unregisters() {
        let mut s = session(4, 2);
        s.start(ActivityLabel::Walking);
        feed(&mut s, 1.0);
        feed(&mut s, 2.0);

        s.stop().unwrap();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(!s.source().is_registered());
        assert_eq!(s.buffered(), 0);
        assert!(s.dataset().is_empty());
    }

    #[test]
    fn test_label_switch_discards_buffer_keeps_records() {
        let mut s = session(4, 2);
        s.start(ActivityLabel::Walking);
        for v in 1..=5 {
            feed(&mut s, v as f32);
        }
        assert_eq!(s.dataset().len(), 1);
        assert_eq!(s.buffered(), 3);

        s.start(ActivityLabel::Running);
        assert_eq!(s.current_label(), Some(ActivityLabel::Running));
        assert_eq!(s.buffered(), 0);
        assert_eq!(s.dataset().len(), 1);
        assert_eq!(s.source().registrations(), 1);

        for v in 10..=13 {
            feed(&mut s, v as f32);
        }
        let records = s.dataset().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].activity, ActivityLabel::Walking);
        assert_eq!(records[1].activity, ActivityLabel::Running);
        assert_eq!(records[1].features.min, 10.0);
    }

    #[test]
    fn test_restart_after_stop_keeps_dataset() {
        let mut s = session(4, 2);
        s.start(ActivityLabel::Stairs);
        for v in 1..=4 {
            feed(&mut s, v as f32);
        }
        s.stop().unwrap();

        s.start(ActivityLabel::Stationary);
        for _ in 0..4 {
            feed(&mut s, 9.81);
        }
        s.stop().unwrap();

        assert_eq!(s.source().registrations(), 2);
        assert_eq!(s.dataset().len(), 2);
        let still = s.dataset().records()[1].features;
        assert_eq!(still.std_dev, 0.0);
        assert_eq!(s.store().saved().map(Dataset::len), Some(2));
    }

    #[test]
    fn test_persist_failure_keeps_record_and_retries() {
        let mut s = session(4, 2);
        s.start(ActivityLabel::Walking);
        s.store_mut().set_available(false);

        let mut outcome = SampleOutcome::Buffered;
        for v in 1..=4 {
            outcome = feed(&mut s, v as f32);
        }
        match outcome {
            SampleOutcome::Unsaved { error, .. } => {
                assert!(matches!(error, StoreError::StorageUnavailable { .. }))
            }
            other => panic!("expected unsaved window, got {:?}", other),
        }
        assert!(s.is_sampling());
        assert_eq!(s.dataset().len(), 1);
        assert_eq!(s.pending(), 1);
        assert_eq!(s.buffered(), 2);

        s.store_mut().set_available(true);
        feed(&mut s, 5.0);
        assert!(matches!(feed(&mut s, 6.0), SampleOutcome::Recorded(_)));
        assert_eq!(s.pending(), 0);
        assert_eq!(s.store().saved().map(Dataset::len), Some(2));
    }

    #[test]
    fn test_stop_retries_unsaved_records() {
        let mut s = session(4, 2);
        s.start(ActivityLabel::Walking);
        s.store_mut().set_available(false);
        for v in 1..=4 {
            feed(&mut s, v as f32);
        }
        assert_eq!(s.pending(), 1);

        s.store_mut().set_available(true);
        s.stop().unwrap();
        assert_eq!(s.pending(), 0);
        assert_eq!(s.store().saved().map(Dataset::len), Some(1));
    }

    #[test]
    fn test_stop_reports_failed_retry_but_goes_idle() {
        let mut s = session(4, 2);
        s.start(ActivityLabel::Walking);
        s.store_mut().set_available(false);
        for v in 1..=4 {
            feed(&mut s, v as f32);
        }

        assert!(s.stop().is_err());
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.dataset().len(), 1);
    }

    #[test]
    fn test_overlap_equal_to_window_gives_disjoint_windows() {
        let mut s = session(3, 3);
        s.start(ActivityLabel::Running);
        for v in 1..=7 {
            feed(&mut s, v as f32);
        }
        let mins: Vec<f64> = s.dataset().iter().map(|r| r.features.min).collect();
        assert_eq!(mins, vec![1.0, 4.0]);
        assert_eq!(s.buffered(), 1);
    }

    #[test]
    fn test_run_processes_event_stream() {
        let mut s = session(4, 2);
        let mut events = vec![SessionEvent::Sample(MotionSample::new(0, [0.0, 0.0, 1.0]))];
        events.push(SessionEvent::Start(ActivityLabel::Walking));
        for v in 1..=6 {
            events.push(SessionEvent::Sample(MotionSample::new(v, [0.0, 0.0, v as f32])));
        }
        events.push(SessionEvent::Stop);
        events.push(SessionEvent::Sample(MotionSample::new(7, [0.0, 0.0, 7.0])));

        let summary = s.run(events);
        assert_eq!(
            summary,
            RunSummary {
                samples: 8,
                rejected_samples: 2,
                windows: 2,
                persist_failures: 0,
                aborts: 0,
            }
        );
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let mut s = session(4, 2);
        let events = vec![
            SessionEvent::Start(ActivityLabel::Running),
            SessionEvent::Shutdown,
            SessionEvent::Sample(MotionSample::new(0, [0.0, 0.0, 1.0])),
        ];
        let summary = s.run(events);
        assert_eq!(summary.samples, 0);
        assert!(!s.is_sampling());
        assert!(!s.source().is_registered());
    }

    #[test]
    fn test_run_counts_persist_failures() {
        let mut s = session(2, 1);
        s.store_mut().set_available(false);
        let mut events = vec![SessionEvent::Start(ActivityLabel::Walking)];
        for v in 1..=3 {
            events.push(SessionEvent::Sample(MotionSample::new(v, [v as f32, 0.0, 0.0])));
        }
        events.push(SessionEvent::Stop);

        let summary = s.run(events);
        assert_eq!(summary.windows, 2);
        // Two windows plus the retry on stop.
        assert_eq!(summary.persist_failures, 3);
        assert_eq!(s.pending(), 2);
    }
}
