use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::{info, warn};

use sessionguard_core::{elapsed_minutes, GuardOptions, SessionGuard};
use sessionguard_host::{Clock, Document, ManualClock, SystemClock};
use sessionguard_logging::{LogEvent, Logger};
use sessionguard_tracker::{
    AnalyticsTracker, HitModel, MemoryTransport, SendCall, Tracker, TrackerError, Transport,
};

use crate::scenario::Step;

/// Outcome of a replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: usize,
    pub failed_steps: usize,
    pub guard_active: bool,
    pub guard_removed: bool,
    pub hits_by_type: BTreeMap<String, usize>,
    pub hits: Vec<HitModel>,
}

impl ReplayReport {
    pub fn exit_code(&self) -> u8 {
        if self.failed_steps == 0 {
            0
        } else {
            1
        }
    }
}

/// Transport that logs each delivered hit against the step that caused it
struct LoggingTransport {
    logger: Arc<Logger>,
    step: Cell<usize>,
    delivered: MemoryTransport,
}

impl LoggingTransport {
    fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            step: Cell::new(0),
            delivered: MemoryTransport::new(),
        }
    }
}

impl Transport for LoggingTransport {
    fn deliver(&self, model: &HitModel) -> Result<(), TrackerError> {
        self.logger.log(&LogEvent::HitDelivered {
            step: self.step.get(),
            hit_type: model.hit_type().unwrap_or_default().to_string(),
            fields: serde_json::to_value(model).unwrap_or_default(),
        });
        self.delivered.deliver(model)
    }
}

/// Replays scenario steps against an analytics tracker wrapped in a session
/// guard, on a manual clock.
pub struct ScenarioRunner {
    options: GuardOptions,
    logger: Arc<Logger>,
    start_ms: i64,
    headless: bool,
}

impl ScenarioRunner {
    pub fn new(options: GuardOptions, logger: Arc<Logger>) -> Self {
        Self {
            options,
            logger,
            start_ms: SystemClock.now_ms(),
            headless: false,
        }
    }

    pub fn with_start_ms(mut self, start_ms: i64) -> Self {
        self.start_ms = start_ms;
        self
    }

    /// Replay on a host without visibility listeners
    pub fn with_headless_host(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn run(&self, steps: &[Step]) -> ReplayReport {
        let clock = Rc::new(ManualClock::new(self.start_ms));
        let document = Rc::new(if self.headless {
            Document::headless()
        } else {
            Document::new()
        });
        let transport = Rc::new(LoggingTransport::new(self.logger.clone()));
        let tracker = Rc::new(AnalyticsTracker::new(transport.clone()));

        let mut guard = Some(SessionGuard::with_clock(
            tracker.clone(),
            document.clone(),
            clock.clone(),
            self.options.clone(),
        ));
        let guard_active = guard.as_ref().is_some_and(SessionGuard::is_active);
        self.logger.log(&LogEvent::GuardInstalled {
            tracker: tracker.name().to_string(),
            active: guard_active,
        });

        let mut failed_steps = 0;
        for (index, step) in steps.iter().enumerate() {
            transport.step.set(index);

            let result = match step {
                Step::Advance { .. } => step.advance_by().map(|by| {
                    let by = by.unwrap_or_default();
                    clock.advance(by);
                    let (idle_minutes, timed_out) = match &guard {
                        Some(guard) => (
                            elapsed_minutes(clock.now_ms(), guard.last_hit_time_ms()),
                            guard.session_has_timed_out(),
                        ),
                        None => (0.0, false),
                    };
                    self.logger.log(&LogEvent::ClockAdvanced {
                        step: index,
                        by_secs: by.as_secs_f64(),
                        idle_minutes,
                        timed_out,
                    });
                }),
                Step::Send { args } => {
                    let call = SendCall::from_args(args.clone());
                    let sent = match &guard {
                        Some(guard) => guard.send(call),
                        None => tracker.send(call),
                    };
                    sent.map_err(anyhow::Error::from)
                }
                Step::Visibility { state } => {
                    let notified = document.set_visibility_state(state.clone());
                    self.logger.log(&LogEvent::VisibilityChanged {
                        step: index,
                        state: state.to_string(),
                        notified,
                    });
                    Ok(())
                }
                Step::Remove => match guard.take() {
                    Some(guard) => {
                        guard.remove();
                        self.logger.log(&LogEvent::GuardRemoved { step: index });
                        Ok(())
                    }
                    None => Err(anyhow!("guard already removed")),
                },
            };

            if let Err(e) = result {
                warn!(step = index + 1, error = %e, "Replay step failed");
                self.logger.log(&LogEvent::StepFailed {
                    step: index,
                    error: e.to_string(),
                });
                failed_steps += 1;
            }
        }

        let guard_removed = guard.is_none();
        drop(guard);

        let hits = transport.delivered.hits();
        let mut hits_by_type = BTreeMap::new();
        for hit_type in transport.delivered.hit_types() {
            *hits_by_type.entry(hit_type).or_insert(0) += 1;
        }

        info!(steps = steps.len(), hits = hits.len(), failed_steps, "Replay finished");
        self.logger.log(&LogEvent::ReplayCompleted {
            steps: steps.len(),
            hits: hits.len(),
        });

        ReplayReport {
            steps: steps.len(),
            failed_steps,
            guard_active,
            guard_removed,
            hits_by_type,
            hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::parse_scenario_str;
    use sessionguard_logging::LogFormat;

    const START_MS: i64 = 1_767_225_600_000;

    fn runner(options: GuardOptions) -> ScenarioRunner {
        ScenarioRunner::new(options, Arc::new(Logger::new(LogFormat::Compact)))
            .with_start_ms(START_MS)
    }

    fn hit_types(report: &ReplayReport) -> Vec<&str> {
        report
            .hits
            .iter()
            .map(|hit| hit.hit_type().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_expired_session_gets_virtual_pageview() {
        let steps = parse_scenario_str(
            r#"
{"step":"send","args":["pageview"]}
{"step":"advance","minutes":31}
{"step":"send","args":["event","Video","play"]}
"#,
        )
        .unwrap();

        let report = runner(GuardOptions::default().with_virtual_pageview_field("page", "/back"))
            .run(&steps);

        assert_eq!(hit_types(&report), vec!["pageview", "pageview", "event"]);
        assert_eq!(report.hits[1].get_str("page"), Some("/back"));
        assert_eq!(report.hits_by_type["pageview"], 2);
        assert_eq!(report.failed_steps, 0);
        assert!(report.guard_active);
        assert!(!report.guard_removed);
    }

    #[test]
    fn test_activity_within_timeout_is_untouched() {
        let steps = parse_scenario_str(
            r#"
{"step":"send","args":["pageview"]}
{"step":"advance","minutes":29,"seconds":59}
{"step":"send","args":["event","Video","play"]}
"#,
        )
        .unwrap();

        let report = runner(GuardOptions::default()).run(&steps);

        assert_eq!(hit_types(&report), vec!["pageview", "event"]);
    }

    #[test]
    fn test_visibility_changes_after_timeout() {
        let steps = parse_scenario_str(
            r#"
{"step":"visibility","state":"hidden"}
{"step":"advance","minutes":45}
{"step":"visibility","state":"visible"}
"#,
        )
        .unwrap();

        let report = runner(GuardOptions::default()).run(&steps);

        // hidden change event, then a pageview for the return
        assert_eq!(hit_types(&report), vec!["event", "pageview"]);
        assert_eq!(report.hits[0].get_str("eventLabel"), Some("hidden"));
    }

    #[test]
    fn test_no_injection_after_remove() {
        let steps = parse_scenario_str(
            r#"
{"step":"remove"}
{"step":"advance","minutes":60}
{"step":"send","args":["event","Video","play"]}
{"step":"visibility","state":"hidden"}
"#,
        )
        .unwrap();

        let report = runner(GuardOptions::default()).run(&steps);

        assert_eq!(hit_types(&report), vec!["event"]);
        assert!(report.guard_removed);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_second_remove_fails_step() {
        let steps = parse_scenario_str("{\"step\":\"remove\"}\n{\"step\":\"remove\"}\n").unwrap();

        let report = runner(GuardOptions::default()).run(&steps);

        assert_eq!(report.failed_steps, 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_invalid_command_fails_step() {
        let steps = parse_scenario_str("{\"step\":\"send\",\"args\":[42]}").unwrap();

        let report = runner(GuardOptions::default()).run(&steps);

        assert!(report.hits.is_empty());
        assert_eq!(report.failed_steps, 1);
    }

    #[test]
    fn test_headless_host_leaves_hits_alone() {
        let steps = parse_scenario_str(
            r#"
{"step":"advance","minutes":90}
{"step":"send","args":["event","Video","play"]}
{"step":"visibility","state":"hidden"}
"#,
        )
        .unwrap();

        let report = runner(GuardOptions::default())
            .with_headless_host(true)
            .run(&steps);

        assert!(!report.guard_active);
        assert_eq!(hit_types(&report), vec!["event"]);
    }
}
