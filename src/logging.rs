#![cfg(feature = "std")]

use std::env;

use log::{self, Level, LevelFilter, Metadata, Record};

use crate::render::{paint, BLUE, CYAN, RED, WHITE, YELLOW};

struct ServerLogger;

impl log::Log for ServerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => RED,
            Level::Warn => YELLOW,
            Level::Info => BLUE,
            Level::Debug | Level::Trace => CYAN,
        };
        let line = format!(
            "{} {} {}",
            paint(&format!("[{}]", timestamp()), WHITE),
            paint(&format!("[{}]", record.level()), color),
            record.args()
        );
        if record.level() == Level::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    fn flush(&self) {}
}

/// Local wall-clock time as `YYYY-MM-DD HH:MM:SS`, as printed in front of
/// every log line.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

static LOGGER: ServerLogger = ServerLogger;

/// Initialize logging with a level taken from the `GOMOKU_LOG` environment variable.
/// Defaults to `info` if the variable is not set or invalid.
pub fn init_logging() {
    let level = env::var("GOMOKU_LOG")
        .ok()
        .and_then(|lvl| lvl.parse().ok())
        .unwrap_or(LevelFilter::Info);
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level));
}
