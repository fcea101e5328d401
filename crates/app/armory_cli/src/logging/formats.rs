use std::io::Write;

use flexi_logger::{DeferredNow, style};
use log::{Level, Record};

/// `LEVEL message`, with the emitting module added at debug and trace.
pub fn cli_format(
    w: &mut dyn Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    let label = style(level).paint(format!("{level:<5}"));
    match level {
        Level::Debug | Level::Trace => write!(
            w,
            "{label} [{}] {}",
            record.module_path().unwrap_or("<unnamed>"),
            record.args()
        ),
        _ => write!(w, "{label} {}", record.args()),
    }
}
