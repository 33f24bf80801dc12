//! Thin facade over the `log` crate. Every module routes through these
//! macros rather than calling `log::*` directly, so the whole crate can be
//! built with logging compiled out entirely on the `log` feature's absence.

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)+) => { ::log::debug!($($arg)+) };
}
#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)+) => {};
}

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)+) => { ::log::info!($($arg)+) };
}
#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)+) => {};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)+) => { ::log::warn!($($arg)+) };
}
#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)+) => {};
}

#[cfg(feature = "log")]
macro_rules! log_error {
    ($($arg:tt)+) => { ::log::error!($($arg)+) };
}
#[cfg(not(feature = "log"))]
macro_rules! log_error {
    ($($arg:tt)+) => {};
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;
