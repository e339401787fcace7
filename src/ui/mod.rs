//! Terminal output for the CLI: a color theme picked once per process, a few
//! status-line helpers and the target table.

pub mod table;

pub use table::{target_table, TableBuilder};

use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();
static QUIET: OnceLock<bool> = OnceLock::new();

pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const SEARCH: &str = "🔍";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DEL: &str = "🗑️";
    pub const DATABASE: &str = "🗄️";
    pub const PHONE: &str = "📱";
    pub const KEY: &str = "🔑";
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
}

impl Theme {
    /// Colored on an interactive terminal unless colors are turned off (`NO_COLOR`, `CLICOLOR=0`)
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() && console::colors_enabled() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

/// Whether human-readable success lines are suppressed (`P2_QUIET=1`)
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("P2_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    if !is_quiet() {
        println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
    }
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO.style(theme().info.clone()), label.style(theme().dim.clone()), value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}
