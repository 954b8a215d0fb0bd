//! Per-thread log capture for tests built with the `log` backend

use std::cell::RefCell;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct CaptureLogger;

static LOGGER: CaptureLogger = CaptureLogger;

std::thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

/// Install the logger and forget what this thread logged so far
pub fn start() {
    // already installed by another test
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Drain the records logged on this thread
pub fn take() -> Vec<(Level, String)> {
    RECORDS.with(|records| records.take())
}
