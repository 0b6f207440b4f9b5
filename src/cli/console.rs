use colored::*;

use super::commands::ReplayStats;
use crate::permissions::{AccessLevel, PermissionRequirement};
use crate::report::{PermissionManifest, PermissionRecord};

/// Console handles terminal output with colored formatting
///
/// Machine-readable output (JSON, YAML) goes to stdout uncolored; everything
/// meant for a human goes to stderr.
pub struct Console {
    heading_color: Color,
    write_color: Color,
    read_color: Color,
}

impl Console {
    pub fn new() -> Self {
        Self {
            heading_color: Color::BrightBlue,
            write_color: Color::Yellow,
            read_color: Color::Green,
        }
    }

    pub fn with_colors(heading_color: Color, write_color: Color, read_color: Color) -> Self {
        Self {
            heading_color,
            write_color,
            read_color,
        }
    }

    fn requirement(&self, requirement: &PermissionRequirement) -> ColoredString {
        let text = requirement.to_string();
        if requirement.is_unknown() {
            text.red().bold()
        } else if requirement.access == AccessLevel::Write {
            text.color(self.write_color)
        } else {
            text.color(self.read_color)
        }
    }

    /// One classified request
    pub fn print_classification(&self, method: &str, path: &str, requirements: &[PermissionRequirement]) {
        let rendered = if requirements.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            requirements
                .iter()
                .map(|r| self.requirement(r).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        eprintln!("{} {} -> {}", method.bold(), path, rendered);
    }

    /// Manifest YAML on stdout, heading on stderr
    pub fn print_manifest(&self, manifest: &PermissionManifest) {
        eprintln!("{}", "Minimal required permissions:".color(self.heading_color).bold());
        print!("{}", manifest.render_yaml());
    }

    pub fn print_unclassified(&self, records: &[PermissionRecord]) {
        if records.is_empty() {
            return;
        }
        eprintln!("{}", "─".repeat(60).yellow());
        eprintln!(
            "{} {} call(s) could not be classified:",
            "Warning:".yellow().bold(),
            records.len()
        );
        for record in records {
            eprintln!("  {} {}{}", record.method, record.host, record.path);
        }
        eprintln!("{}", "─".repeat(60).yellow());
    }

    pub fn print_replay_stats(&self, stats: &ReplayStats) {
        eprintln!(
            "{} {} request(s): {} recorded, {} ignored, {} unclassified, {} failed",
            "Replayed".color(self.heading_color).bold(),
            stats.total,
            stats.recorded,
            stats.ignored,
            stats.unclassified,
            stats.failed
        );
    }

    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
