//! Minimal producer program: register a couple of sinks, log through the
//! macros, shut down cleanly.
//!
//! Run with `cargo run --example basic_use`; output lands under `logs/`.

use std::fmt::Write;

use quill_pipeline::{
    log_async, log_async_every, log_async_if, log_stream, register_log,
    register_size_rotated_log, set_logging_level, should_log, shutdown_logging, Level,
    LOG_DEBUG, LOG_INFO, LOG_WARN,
};

fn main() {
    // Diagnostics from the pipeline itself (rotation failures, dispatcher
    // summary) go through tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    std::fs::create_dir_all("logs").expect("failed to create logs directory");

    // Sinks are user-owned: keep the handles alive for as long as the logs
    // should receive records.
    let _everything = register_log("logs/basic_use.log");
    let _sized = register_size_rotated_log("logs/basic_use_sized.log", 64 * 1024, 3);

    set_logging_level(Level::Debug);

    log_async!([LOG_INFO, "STARTUP"], "application ready");

    for worker in 0..4 {
        for step in 0..250 {
            log_async_every!(100, [LOG_DEBUG], "worker {worker} reached step {step}");
            log_async_if!(step == 137, [LOG_WARN], "worker {worker} hit the odd step");
        }
    }

    // Stream style: the guard commits one record when it drops.
    {
        let mut line = log_stream!([LOG_INFO]);
        let _ = write!(line, "processed {} workers", 4);
    }

    assert!(should_log(&[LOG_INFO]));

    shutdown_logging();
    println!("done; see logs/basic_use.log");
}
