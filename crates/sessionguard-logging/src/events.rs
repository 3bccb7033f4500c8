use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fields left out of the one-line hit summary
const SUMMARY_SKIPPED_FIELDS: [&str; 3] = ["hitType", "clientId", "trackerName"];

/// Structured log events for a scenario replay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    ReplayStarted {
        scenario: PathBuf,
        steps: usize,
        session_timeout_minutes: f64,
    },
    GuardInstalled {
        tracker: String,
        active: bool,
    },
    ClockAdvanced {
        step: usize,
        by_secs: f64,
        idle_minutes: f64,
        timed_out: bool,
    },
    /// A hit reached the transport
    HitDelivered {
        step: usize,
        hit_type: String,
        fields: serde_json::Value,
    },
    VisibilityChanged {
        step: usize,
        state: String,
        notified: bool,
    },
    GuardRemoved {
        step: usize,
    },
    StepFailed {
        step: usize,
        error: String,
    },
    ReplayCompleted {
        steps: usize,
        hits: usize,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for replay events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::ReplayStarted {
                scenario,
                steps,
                session_timeout_minutes,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "sessionguard".bold().bright_white(),
                    " ".repeat(55) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Scenario:".dimmed(),
                    Self::truncate_with_padding(&scenario.display().to_string(), 56, 66)
                        .dimmed()
                );
                let summary = format!("{} steps, timeout {}m", steps, session_timeout_minutes);
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Replay:".dimmed(),
                    Self::truncate_with_padding(&summary, 58, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::GuardInstalled { tracker, active } => {
                if *active {
                    let _ = writeln!(
                        stderr,
                        "  {} Guard installed on tracker {}",
                        "✓".bright_green(),
                        tracker.bold()
                    );
                } else {
                    let _ = writeln!(
                        stderr,
                        "  {} Guard inert: host has no visibility listeners",
                        "⚠".bright_yellow()
                    );
                }
            }
            LogEvent::ClockAdvanced {
                by_secs,
                idle_minutes,
                timed_out,
                ..
            } => {
                let idle = format!("idle {:.1}m", idle_minutes);
                let idle = if *timed_out {
                    format!("{} (session expired)", idle).bright_yellow()
                } else {
                    idle.dimmed()
                };
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "⏱".dimmed(),
                    format!("+{:.0}s", by_secs).dimmed(),
                    idle
                );
            }
            LogEvent::HitDelivered {
                hit_type, fields, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    hit_type.to_uppercase().bright_cyan().bold(),
                    Self::summarize_fields(fields).dimmed()
                );
            }
            LogEvent::VisibilityChanged {
                state, notified, ..
            } => {
                let note = if *notified { "" } else { " (unchanged)" };
                let _ = writeln!(
                    stderr,
                    "  {} visibility {}{}",
                    "◐".bright_magenta(),
                    state.bright_magenta(),
                    note.dimmed()
                );
            }
            LogEvent::GuardRemoved { .. } => {
                let _ = writeln!(stderr, "  {} Guard removed", "■".bright_blue());
            }
            LogEvent::StepFailed { step, error } => {
                let _ = writeln!(
                    stderr,
                    "  {} Step {} failed: {}",
                    "✗".bright_red(),
                    step + 1,
                    error.bright_red()
                );
            }
            LogEvent::ReplayCompleted { .. } => {
                // Printed by the final report in main.rs
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::ReplayStarted { steps, .. } => {
                format!("[{}] replay:start steps={}", timestamp, steps)
            }
            LogEvent::GuardInstalled { tracker, active } => {
                format!("[{}] guard:install:{} active={}", timestamp, tracker, active)
            }
            LogEvent::ClockAdvanced {
                step,
                idle_minutes,
                timed_out,
                ..
            } => format!(
                "[{}] clock:{} idle={:.1}m{}",
                timestamp,
                step + 1,
                idle_minutes,
                if *timed_out { " expired" } else { "" }
            ),
            LogEvent::HitDelivered {
                step,
                hit_type,
                fields,
            } => format!(
                "[{}] hit:{}:{} {}",
                timestamp,
                step + 1,
                hit_type,
                Self::summarize_fields(fields)
            ),
            LogEvent::VisibilityChanged { step, state, .. } => {
                format!("[{}] visibility:{}:{}", timestamp, step + 1, state)
            }
            LogEvent::GuardRemoved { step } => {
                format!("[{}] guard:remove:{}", timestamp, step + 1)
            }
            LogEvent::StepFailed { step, error } => {
                format!("[{}] error:{}:{}", timestamp, step + 1, error)
            }
            LogEvent::ReplayCompleted { steps, hits } => {
                format!("[{}] replay:done steps={} hits={}", timestamp, steps, hits)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// `key=value` pairs of a hit, without bookkeeping fields
    fn summarize_fields(fields: &serde_json::Value) -> String {
        let Some(map) = fields.as_object() else {
            return String::new();
        };
        map.iter()
            .filter(|(key, _)| !SUMMARY_SKIPPED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{}={}", key, s),
                other => format!("{}={}", key, other),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
