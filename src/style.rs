//! ANSI styling and environment toggles for diagnostic rendering.
//!
//! The core never prints; these helpers are consumed by whoever formats
//! alerts (the CLI front-end, tests, `display_with_source`).

use std::io::IsTerminal;

/// True when the recursive-descent parser toggle is set. The recursive
/// descent engine is the only parser in this crate, so the variable is
/// recognised for compatibility and changes nothing.
pub fn rd_parser_enabled() -> bool {
    std::env::var("JAC_RD_PARSER").map(|v| v == "1").unwrap_or(false)
}

/// Colour is on unless `NO_COLOR` is set or stderr is not a terminal.
pub fn colors_enabled() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stderr().is_terminal()
}

/// Emoji is on unless `NO_EMOJI`, `TERM=dumb`, or legacy Windows.
pub fn emoji_enabled() -> bool {
    if std::env::var_os("NO_EMOJI").is_some() {
        return false;
    }
    if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
        return false;
    }
    if cfg!(windows) && std::env::var_os("WT_SESSION").is_none() {
        return false;
    }
    true
}

pub struct Style;

impl Style {
    fn wrap(code: &str, text: &str, enabled: bool) -> String {
        if enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub fn bold_red(text: &str) -> String {
        Self::wrap("1;31", text, colors_enabled())
    }

    pub fn yellow(text: &str) -> String {
        Self::wrap("33", text, colors_enabled())
    }

    pub fn blue(text: &str) -> String {
        Self::wrap("34", text, colors_enabled())
    }

    pub fn cyan(text: &str) -> String {
        Self::wrap("36", text, colors_enabled())
    }

    pub fn red(text: &str) -> String {
        Self::wrap("31", text, colors_enabled())
    }
}
