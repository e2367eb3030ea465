//! Terminal output: the console chat surface, notes and table rendering.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use clara_core::ChatSurface;
use crossterm::{cursor::MoveTo, execute, terminal::{Clear, ClearType}};

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Visible width of `s`, ignoring ANSI escape codes.
pub fn visible_len(s: &str) -> usize {
    let mut len = 0;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' { break; }
            }
        } else {
            len += 1;
        }
    }
    len
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Console chat surface
// ---------------------------------------------------------------------------

/// Chat surface on stdout. Operator input is read from stdin by the host.
pub struct ConsoleSurface {
    color: bool,
    input_enabled: AtomicBool,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            color: supports_color(),
            input_enabled: AtomicBool::new(false),
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled.load(Ordering::SeqCst)
    }

    fn format_message(&self, sender: &str, text: &str) -> String {
        if !self.color {
            return format!("{sender}: {text}");
        }
        let tint = match sender {
            "Error" => RED,
            "You" => GREEN,
            _ => CYAN,
        };
        format!("{tint}{BOLD}{sender}{RESET}: {text}")
    }
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSurface for ConsoleSurface {
    fn add_message(&self, sender: &str, text: &str) {
        println!("{}", self.format_message(sender, text));
    }

    fn disable_input(&self) {
        self.input_enabled.store(false, Ordering::SeqCst);
        if self.color {
            print!("{DIM}…{RESET}\r");
            let _ = io::stdout().flush();
        }
    }

    fn enable_input(&self) {
        self.input_enabled.store(true, Ordering::SeqCst);
        let prompt = if self.color { format!("{GREEN}{BOLD}>{RESET} ") } else { "> ".to_string() };
        print!("{prompt}");
        let _ = io::stdout().flush();
    }

    fn clear(&self) {
        let _ = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

/// Render a left-aligned table with the given headers.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_len(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(visible_len(cell));
        }
    }

    let render_row = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell}{}", " ".repeat(width.saturating_sub(visible_len(cell)))))
            .collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };

    let mut out = render_row(headers.to_vec());
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", sep.join("  ")));
    for row in rows {
        let cells = (0..widths.len())
            .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        out.push_str(&render_row(cells));
    }
    out
}
