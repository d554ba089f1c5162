//! ANSI color helpers for terminal output

pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
}

use ansi::*;

/// Assistant reply (cyan)
pub fn assistant(msg: &str) -> String {
    format!("{}{}{}", CYAN, msg, RESET)
}

pub fn success(msg: &str) -> String {
    format!("{}{}{}", GREEN, msg, RESET)
}

pub fn error(msg: &str) -> String {
    format!("{}{}{}", RED, msg, RESET)
}

pub fn warning(msg: &str) -> String {
    format!("{}{}{}", YELLOW, msg, RESET)
}

pub fn prompt() -> String {
    format!("{}{}>>> {}", BOLD, MAGENTA, RESET)
}

/// Startup banner line: dim label, plain value
pub fn banner_line(label: &str, value: &str) -> String {
    format!("{}{:<12}{} {}", DIM, label, RESET, value)
}
