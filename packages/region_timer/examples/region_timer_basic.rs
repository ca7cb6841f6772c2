//! Instruments a small block pipeline with region timers and prints the resulting tree.
//!
//! Each worker thread gets its own timer from a registry. The unbalanced exit at the end
//! shows the warning that the timer logs instead of failing.
//!
//! Run with: `cargo run --example region_timer_basic`.
#![expect(
    clippy::indexing_slicing,
    reason = "this is example code that doesn't need production-level safety"
)]

use std::hint::black_box;
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;

use region_timer::{TimedRead, TimedWrite, TimerRegistry};

fn checksum(block: &[u8]) -> u32 {
    block
        .iter()
        .fold(0_u32, |sum, byte| sum.rotate_left(5) ^ u32::from(*byte))
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("debug").init();

    // Independent of the REGION_TIMER_TIMING switch, so the example always has output.
    let registry = Arc::new(TimerRegistry::new(true));

    let workers: Vec<_> = (0..2)
        .map(|index| {
            let registry = Arc::clone(&registry);

            thread::Builder::new()
                .name(format!("block-writer-{index}"))
                .spawn(move || {
                    let timer = registry.timer_for_thread();
                    let input = vec![0x5a_u8; 65_536];

                    let mut source = TimedRead::with_timer(&input[..], timer.clone(), "read");
                    let mut sink = TimedWrite::with_timer(Vec::new(), timer.clone(), "write");
                    let mut block = [0_u8; 4096];

                    loop {
                        let _span = timer.span("block");

                        let read = source.read(&mut block).expect("reading from memory");
                        if read == 0 {
                            break;
                        }

                        timer.enter("checksum");
                        black_box(checksum(&block[..read]));
                        timer.change("store");
                        sink.write_all(&block[..read]).expect("writing to memory");
                        timer.exit("store");
                    }

                    // Leaving the top-level region is not possible, so this only logs a warning.
                    timer.exit(&format!("block-writer-{index}"));

                    timer.print_to_stdout();
                    println!("{}", timer.to_json());
                })
                .expect("spawning worker thread")
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker thread panicked");
    }
}
