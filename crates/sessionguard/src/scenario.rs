//! Scenario files: JSON lines, one replay step per line.
//!
//! ```text
//! {"step":"send","args":["pageview"]}
//! {"step":"advance","minutes":31}
//! {"step":"visibility","state":"hidden"}
//! {"step":"remove"}
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use sessionguard_host::VisibilityState;

/// A single replay step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Move the clock forward
    Advance {
        #[serde(default)]
        minutes: f64,
        #[serde(default)]
        seconds: f64,
    },
    /// Send a command with the given arguments
    Send { args: Vec<Value> },
    /// Change the page visibility state
    Visibility { state: VisibilityState },
    /// Tear down the guard
    Remove,
}

impl Step {
    /// How far an `advance` step moves the clock. `None` for other steps.
    pub fn advance_by(&self) -> Result<Option<Duration>> {
        match self {
            Step::Advance { minutes, seconds } => advance_duration(*minutes, *seconds).map(Some),
            _ => Ok(None),
        }
    }

    /// One-line description for dry runs
    pub fn describe(&self) -> String {
        match self {
            Step::Advance { minutes, seconds } => {
                format!("advance {}s", minutes * 60.0 + seconds)
            }
            Step::Send { args } => {
                let args: Vec<String> = args.iter().map(Value::to_string).collect();
                format!("send({})", args.join(", "))
            }
            Step::Visibility { state } => format!("visibility -> {}", state),
            Step::Remove => "remove guard".to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        self.advance_by().map(|_| ())
    }
}

/// Rejects negative, non-finite and unrepresentable totals
fn advance_duration(minutes: f64, seconds: f64) -> Result<Duration> {
    let total = minutes * 60.0 + seconds;
    Duration::try_from_secs_f64(total).map_err(|e| {
        anyhow!(
            "advance must move the clock forward by a finite duration, got {}s: {}",
            total,
            e
        )
    })
}

/// Parse a scenario file.
pub fn parse_scenario(path: &Path) -> Result<Vec<Step>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {:?}", path))?;
    parse_scenario_str(&content).with_context(|| format!("Invalid scenario {:?}", path))
}

/// Parse scenario text. Blank lines and `#` comments are skipped.
pub fn parse_scenario_str(content: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let step: Step = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse step on line {}", index + 1))?;
        step.validate()
            .with_context(|| format!("Invalid step on line {}", index + 1))?;
        steps.push(step);
    }

    Ok(steps)
}
