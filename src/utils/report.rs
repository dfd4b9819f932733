// src/utils/report.rs

//! Presentation helpers for run progress, built on the `log` facade.
//!
//! The binary decides where lines go (env_logger); these helpers only decide
//! how headers, steps and summaries look.

use std::time::Duration;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {step_num}/{total}] {message}");
}

/// Log a progress line tagged with the phase and elapsed time
pub fn progress(phase: &str, elapsed: Duration, message: &str) {
    log::info!("[{phase}] {} {message}", format_elapsed(elapsed));
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    for (key, value) in items {
        log::info!("    {key}: {value}");
    }
}

/// Format a duration as `Hh Mm Ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{}h {}m {}s",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
