//! Diagnostic output macros.
//!
//! These print straight to stdout/stderr. Sink failures are reported through
//! them instead of `tracing`, since the failing sink may be the one the
//! tracing dispatcher writes to.

#[macro_export]
macro_rules! hermes_println {
    () => {
        println!();
    };
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! hermes_error {
    ($($arg:tt)*) => {
        eprintln!("{}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! hermes_error_hint {
    ($($arg:tt)*) => {
        eprintln!("💡 {}", format!($($arg)*));
    };
}

#[macro_export]
macro_rules! hermes_warning {
    ($($arg:tt)*) => {
        eprintln!("⚠ {}", format!($($arg)*));
    };
}
