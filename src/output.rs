//! Status messages about the emulator itself, as opposed to output of the running program.
//!
//! Messages go to stderr so that stdout carries exactly what the program wrote.

use std::fmt::Display;

use colored::{ColoredString, Colorize};

use crate::env;

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

/// Must be called after [`env::init`].
pub fn init() {
    if env::is_minimal() {
        colored::control::set_override(false);
    }
}

/// Print a right-aligned status verb followed by a detail, eg. `     Running target hello.obj`.
///
/// Nothing is printed if `LC3_MINIMAL=1`.
pub fn message(color: MsgColor, left: &str, right: impl Display) {
    if env::is_minimal() {
        return;
    }
    eprintln!("{} {right}", format_verb(color, left));
}

fn format_verb(color: MsgColor, left: &str) -> ColoredString {
    let left = format!("{left:>12}");
    match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_is_right_aligned() {
        colored::control::set_override(false);
        assert_eq!(format_verb(MsgColor::Green, "Running").to_string(), "     Running");
        assert_eq!(format_verb(MsgColor::Red, "Interrupted").to_string(), " Interrupted");
    }
}
