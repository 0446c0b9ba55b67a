//! Leveled logging and output control
//!
//! This module provides the [`Logger`] used by the cache, the refresh loops and
//! the command-line shell. It supports quiet and verbose modes and an
//! optional component prefix.

use std::time::Duration;

/// Logger responsible for all user-visible output
#[derive(Debug, Clone, Default)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
    component: Option<String>,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            component: None,
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
            component: None,
        }
    }

    /// Same settings, every line prefixed with `[component]`
    pub fn with_component(&self, component: &str) -> Self {
        Self {
            verbose: self.verbose,
            quiet: self.quiet,
            component: Some(component.to_string()),
        }
    }

    fn line(&self, message: &str) -> String {
        match &self.component {
            Some(component) => format!("[{}] {}", component, message),
            None => message.to_string(),
        }
    }

    /// Main section heading
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n=== {} ===", title);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("🐛 DEBUG: {}", self.line(message));
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("📝 {}", self.line(message));
        }
    }

    /// Detailed information (only shown in verbose mode)
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("   {}", self.line(message));
        }
    }

    /// Information message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("ℹ️  {}", self.line(message));
        }
    }

    /// Success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("✅ {}", self.line(message));
        }
    }

    /// Warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("⚠️  WARNING: {}", self.line(message));
        }
    }

    /// Error message, printed even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("❌ ERROR: {}", self.line(message));
    }

    /// Format duration in human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();
        let secs = duration.as_secs();
        if secs == 0 {
            format!("{}ms", millis)
        } else if secs < 60 {
            format!("{:.1}s", duration.as_secs_f64())
        } else if secs < 3600 {
            format!("{}m{}s", secs / 60, secs % 60)
        } else {
            format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}
