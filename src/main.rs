//! Trace Activity Recorder
//!
//! Records a short synthetic walking-then-running session into the
//! configured dataset file. Stands in for the mobile host: the synthetic
//! source plays the accelerometer and this binary plays the user pressing
//! start and stop.
//!
//! Configuration comes from the environment (see `config.rs`).

use std::error::Error;
use std::process;
use std::sync::mpsc;
use std::thread;

use trace_activity::{
    ActivityLabel, ActivitySession, Config, DatasetStore, SessionEvent, StoreError, SyntheticSource,
    Waveform,
};

fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(2);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.rust_log.as_str()))
        .init();

    if let Err(e) = run(config) {
        log::error!("Recording failed: {}", e);
        process::exit(1);
    }
}

fn run(config: Config) -> Result<(), Box<dyn Error>> {
    log::info!("Trace Activity Recorder v{}", env!("CARGO_PKG_VERSION"));

    let store = config.open_store();
    if let Err(e) = store.check_available() {
        // Windows are still recorded in memory and retried on stop.
        log::warn!("{} is not writable right now: {}", store.describe(), e);
    }

    let (tx, rx) = mpsc::channel();
    let source = SyntheticSource::new(tx.clone(), config.sample_interval);
    let waveform = source.waveform_handle();
    let mut session = ActivitySession::new(config.window, store, source)?;

    // Enough time for a full window plus a couple of slides per activity.
    let samples_per_activity = config.window.window_size + 2 * config.window.overlap_size;
    let per_activity = config.sample_interval * samples_per_activity as u32;

    let worker = thread::Builder::new()
        .name("session".to_string())
        .spawn(move || {
            let summary = session.run(rx);
            (summary, session.dataset().len(), session.pending())
        })?;

    for label in [ActivityLabel::Walking, ActivityLabel::Running] {
        match waveform.lock() {
            Ok(mut shape) => *shape = Waveform::for_activity(label),
            Err(poisoned) => *poisoned.into_inner() = Waveform::for_activity(label),
        }
        tx.send(SessionEvent::Start(label))?;
        log::info!("Recording {} for {:.1}s", label, per_activity.as_secs_f32());
        thread::sleep(per_activity);
    }
    tx.send(SessionEvent::Stop)?;
    tx.send(SessionEvent::Shutdown)?;

    let (summary, recorded, pending) = worker
        .join()
        .map_err(|_| "session thread panicked".to_string())?;

    println!("Samples received:   {}", summary.samples);
    println!("Samples rejected:   {}", summary.rejected_samples);
    println!("Windows recorded:   {}", recorded);
    println!("Persist failures:   {}", summary.persist_failures);
    println!("Unsaved records:    {}", pending);

    let persisted = match config.open_store().load() {
        Ok(dataset) => dataset.len(),
        Err(StoreError::NotFound { .. }) => 0,
        Err(e) => return Err(e.into()),
    };
    println!("Records in {}: {}", config.dataset_path.display(), persisted);

    Ok(())
}
