//! Standardized logging utility
//!
//! This module provides the `wlog!` macro which ensures always-visible
//! diagnostics follow the `YYYY-MM-DD HH:MM:SS [MODULE] Message` format.
//! Everything else goes through `tracing`.

#[macro_export]
macro_rules! wlog {
    ($module:expr, $($arg:tt)*) => {{
        let now = chrono::Local::now();
        eprintln!("{} [{}] {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            $module,
            format!($($arg)*)
        );
    }};
}

/// Standardized module identifiers
pub const MAIN: &str = "MAIN";
pub const TOUCH: &str = "TOUCH";
