//! Debug output utilities.
//!
//! When debug mode is enabled (via -D flag or IOMMU_GROUPS_DEBUG=1), these
//! macros print diagnostic information to stderr. Useful when a device that
//! you know is there doesn't show up: the skip reason gets logged.
//!
//! Nothing is formatted unless debug mode is on.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

/// Environment variable that turns debug mode on, same as `-D`.
pub const DEBUG_ENV: &str = "IOMMU_GROUPS_DEBUG";

/// Off unless `-D` or the environment variable says otherwise.
static ENABLED: AtomicBool = AtomicBool::new(false);

/// Called once from `run`, after argument parsing.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Write one `[debug]` line to stderr.
pub fn emit(args: fmt::Arguments<'_>) {
    let line = format!("[debug] {}", args);
    crate::print::eprintln(&line);
}

/// `format!`-style debug line. Arguments are not evaluated when disabled.
#[macro_export]
macro_rules! dbg_print {
    ($($arg:tt)*) => {
        if $crate::debug::is_enabled() {
            $crate::debug::emit(format_args!($($arg)*));
        }
    };
}

/// A read that failed; the caller decides what that means.
#[macro_export]
macro_rules! dbg_fail {
    ($path:expr, $err:expr) => {
        $crate::dbg_print!("read {} failed: {}", $path, $err)
    };
}

/// Text that did not parse.
#[macro_export]
macro_rules! dbg_parse {
    ($context:expr, $err:expr) => {
        $crate::dbg_print!("parse {}: {}", $context, $err)
    };
}

/// Entry count of a finished directory or database scan.
#[macro_export]
macro_rules! dbg_scan {
    ($path:expr, $count:expr) => {
        $crate::dbg_print!("scanned {}: {} entries", $path, $count)
    };
}

/// A device left out of the table, and why.
#[macro_export]
macro_rules! dbg_skip {
    ($name:expr, $reason:expr) => {
        $crate::dbg_print!("skipping {}: {}", $name, $reason)
    };
}
