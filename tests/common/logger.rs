//! Phase-tagged test progress output.
#![allow(dead_code)]
//!
//! Lines go to stderr, so they show up with `--nocapture` and stay out of
//! assertions on stdout. Set `TEST_LOG_QUIET=1` to silence them.

use std::cell::RefCell;
use std::time::Instant;

/// Progress logger for one test.
pub struct TestLogger {
    name: String,
    start: Instant,
    phase: RefCell<String>,
    quiet: bool,
}

impl TestLogger {
    /// Start logging for the named test.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let logger = Self {
            name: name.to_string(),
            start: Instant::now(),
            phase: RefCell::new("setup".to_string()),
            quiet: std::env::var("TEST_LOG_QUIET").is_ok_and(|v| v == "1" || v == "true"),
        };
        logger.emit("INFO", "started");
        logger
    }

    /// Enter a new phase (setup, execute, verify, ...).
    pub fn phase(&self, phase: &str) {
        phase.clone_into(&mut self.phase.borrow_mut());
        self.emit("DEBUG", &format!("phase {phase}"));
    }

    pub fn info(&self, message: &str) {
        self.emit("INFO", message);
    }

    /// Mark the test as passed.
    pub fn finish_ok(&self) {
        self.emit("INFO", "passed");
    }

    fn emit(&self, level: &str, message: &str) {
        if self.quiet {
            return;
        }
        eprintln!(
            "[{level:<5}] {:>6}ms {} ({}): {message}",
            self.start.elapsed().as_millis(),
            self.name,
            self.phase.borrow()
        );
    }
}
