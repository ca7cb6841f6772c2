//! Samples a worker thread that marks its functions on its call stack, then prints where it
//! spent its time.
//!
//! Run with: `cargo run --example region_timer_sampling`.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use region_timer::{ExecutionSampler, SampledThread, call_stack};
use testing::spin_for;

fn parse() {
    let _frame = call_stack::frame("Pipeline", "parse");
    spin_for(Duration::from_millis(3));
}

fn index() {
    let _frame = call_stack::frame("Pipeline", "index");
    spin_for(Duration::from_millis(1));
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("debug").init();

    let (target_tx, target_rx) = mpsc::channel();

    let worker = thread::Builder::new()
        .name("pipeline".to_string())
        .spawn(move || {
            target_tx
                .send(SampledThread::current())
                .expect("main thread is waiting for the target");

            let _frame = call_stack::frame("Pipeline", "run");
            for _ in 0..100 {
                parse();
                index();
            }
        })
        .expect("spawning worker thread");

    let target = target_rx.recv().expect("worker sends its target");

    // Enabled explicitly, independent of the REGION_TIMER_SAMPLING switch.
    let mut sampler = ExecutionSampler::builder()
        .name("pipeline")
        .interval(Duration::from_millis(1))
        .target(target)
        .enabled(true)
        .start();

    // Samples are only readable after the sampler has stopped.
    if let Err(error) = sampler.dump_samples() {
        println!("{error}");
    }

    worker.join().expect("worker thread panicked");
    sampler.stop();

    let report = sampler.dump_samples().expect("sampler has been stopped");
    report.print_to_stdout();
}
