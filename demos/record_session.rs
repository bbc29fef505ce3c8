/// Basic usage example: record labeled windows into an in-memory store
use trace_activity::{
    arff, ActivityLabel, ActivitySession, DatasetStore, ManualSource, MemoryStore, MotionSample,
    SampleOutcome, WindowConfig,
};

fn main() {
    println!("=== Trace Activity Recorder: Basic Example ===\n");

    // Tiny windows so the arithmetic is easy to follow: 4 samples, slide by 2
    let config = WindowConfig::new(4, 2).expect("valid window geometry");
    let mut session = ActivitySession::new(config, MemoryStore::new(), ManualSource::new())
        .expect("session");

    session.start(ActivityLabel::Walking);

    // Readings straight up the z axis, so each magnitude equals the z value
    let readings = [
        (1000, [0.0, 0.0, 1.0]),
        (1020, [0.0, 0.0, 2.0]),
        (1040, [0.0, 0.0, 3.0]),
        (1060, [0.0, 0.0, 4.0]),
        (1080, [0.0, 0.0, 5.0]),
        (1100, [0.0, 0.0, 6.0]),
    ];

    println!("Processing {} samples...\n", readings.len());

    for (timestamp, accel) in readings {
        let sample = MotionSample::new(timestamp, accel);
        match session.on_motion_sample(&sample) {
            Ok(SampleOutcome::Buffered) => println!("  t={}ms  buffered ({})", timestamp, session.buffered()),
            Ok(SampleOutcome::Recorded(record)) => {
                let f = record.features;
                println!(
                    "  t={}ms  window -> min={} max={} mean={} stdDev={:.4} [{}]",
                    timestamp, f.min, f.max, f.mean, f.std_dev, record.activity
                );
            }
            Ok(SampleOutcome::Unsaved { record, error }) => {
                println!("  t={}ms  window kept in memory ({}): {:?}", timestamp, error, record)
            }
            Err(e) => println!("  t={}ms  rejected: {}", timestamp, e),
        }
    }

    session.stop().expect("persist on stop");

    // Stopping twice is harmless
    session.stop().expect("idle stop");

    println!("\n=== Stored dataset ===\n");
    let stored = session.store().load().expect("dataset saved");
    print!("{}", arff::to_arff_string(&stored).expect("render ARFF"));
}
