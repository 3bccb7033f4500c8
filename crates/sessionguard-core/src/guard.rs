use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};

use sessionguard_host::{Clock, ListenerId, SystemClock, VisibilityHost, VisibilityState};
use sessionguard_tracker::{DispatchTask, HitModel, SendCall, Tracker, TrackerError};

use crate::timeout::{elapsed_minutes, session_has_timed_out};
use crate::GuardOptions;

const VISIBILITY_CATEGORY: &str = "Page Visibility";
const VISIBILITY_ACTION: &str = "change";

/// State shared by the send path, the dispatch wrapper and the visibility
/// listener
struct GuardState {
    tracker: Rc<dyn Tracker>,
    clock: Rc<dyn Clock>,
    options: GuardOptions,
    /// Written only by the dispatch wrapper, never decreases
    last_hit_time: Rc<Cell<i64>>,
}

impl GuardState {
    fn has_timed_out(&self) -> bool {
        session_has_timed_out(
            self.clock.now_ms(),
            self.last_hit_time.get(),
            self.options.session_timeout_minutes,
        )
    }

    fn virtual_pageview(&self) -> SendCall {
        SendCall::pageview(&self.options.virtual_pageview_fields)
    }

    fn send(&self, call: SendCall) -> Result<(), TrackerError> {
        if !call.is_pageview() && self.has_timed_out() {
            debug!(
                hit_type = call.hit_type().unwrap_or("<none>"),
                idle_minutes = elapsed_minutes(self.clock.now_ms(), self.last_hit_time.get()),
                "Session timed out, sending virtual pageview first"
            );
            self.tracker.send(self.virtual_pageview())?;
        }
        self.tracker.send(call)
    }

    fn handle_visibility_change(&self, visibility: &VisibilityState) -> Result<(), TrackerError> {
        if self.has_timed_out() {
            match visibility {
                VisibilityState::Hidden => {
                    debug!("Session timed out, ignoring change to hidden");
                    return Ok(());
                }
                VisibilityState::Visible => {
                    debug!("Session timed out, treating change to visible as a new pageview");
                    return self.send(self.virtual_pageview());
                }
                VisibilityState::Other(_) => {}
            }
        }

        let mut fields = Map::new();
        fields.insert("eventCategory".into(), VISIBILITY_CATEGORY.into());
        fields.insert("eventAction".into(), VISIBILITY_ACTION.into());
        fields.insert("eventLabel".into(), Value::from(visibility.as_str()));
        fields.insert("transport".into(), "beacon".into());
        self.send(SendCall::event(fields))
    }
}

/// What `remove` has to undo
struct Installation {
    host: Rc<dyn VisibilityHost>,
    listener: ListenerId,
    /// The tracker's dispatch task from before the guard existed
    original_dispatch: Rc<RefCell<DispatchTask>>,
}

/// Decorates a tracker with session timeout reconciliation
///
/// Send hits through the guard instead of the tracker. Every hit the tracker
/// transmits refreshes the guard's last-hit time; a non-pageview hit requested
/// after the session timed out is preceded by a virtual pageview.
///
/// If the host cannot attach visibility listeners the guard is inert and
/// forwards everything untouched.
pub struct SessionGuard {
    state: Rc<GuardState>,
    installation: Option<Installation>,
}

impl SessionGuard {
    pub fn new(
        tracker: Rc<dyn Tracker>,
        host: Rc<dyn VisibilityHost>,
        options: GuardOptions,
    ) -> Self {
        Self::with_clock(tracker, host, Rc::new(SystemClock), options)
    }

    pub fn with_clock(
        tracker: Rc<dyn Tracker>,
        host: Rc<dyn VisibilityHost>,
        clock: Rc<dyn Clock>,
        options: GuardOptions,
    ) -> Self {
        let last_hit_time = Rc::new(Cell::new(clock.now_ms()));
        let state = Rc::new(GuardState {
            tracker,
            clock,
            options,
            last_hit_time,
        });

        if !host.supports_listeners() {
            debug!(
                tracker = state.tracker.name(),
                "Host has no visibility listeners, session guard is inert"
            );
            return Self {
                state,
                installation: None,
            };
        }

        let original_dispatch = Rc::new(RefCell::new(state.tracker.dispatch_task()));
        state.tracker.set_dispatch_task(recording_task(
            original_dispatch.clone(),
            state.clock.clone(),
            state.last_hit_time.clone(),
        ));

        let weak = Rc::downgrade(&state);
        let weak_host = Rc::downgrade(&host);
        let listener = host.add_visibility_listener(Rc::new(move |notified: &VisibilityState| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            // Act on what the host reports now, not on the notification payload
            let visibility = weak_host
                .upgrade()
                .map(|host| host.visibility_state())
                .unwrap_or_else(|| notified.clone());
            if let Err(e) = state.handle_visibility_change(&visibility) {
                warn!(error = %e, visibility = %visibility, "Failed to send visibility hit");
            }
        }));

        info!(
            tracker = state.tracker.name(),
            session_timeout_minutes = state.options.session_timeout_minutes,
            "Session guard installed"
        );

        Self {
            state,
            installation: Some(Installation {
                host,
                listener,
                original_dispatch,
            }),
        }
    }

    /// Whether the guard intercepts anything (false for an inert guard)
    pub fn is_active(&self) -> bool {
        self.installation.is_some()
    }

    /// Time of the last transmitted hit, in milliseconds since the epoch
    pub fn last_hit_time_ms(&self) -> i64 {
        self.state.last_hit_time.get()
    }

    pub fn session_has_timed_out(&self) -> bool {
        self.state.has_timed_out()
    }

    /// React to a visibility change. Attached to the host on construction.
    pub fn handle_visibility_change(
        &self,
        visibility: &VisibilityState,
    ) -> Result<(), TrackerError> {
        self.state.handle_visibility_change(visibility)
    }

    /// Restore the tracker's dispatch task, detach the visibility listener
    /// and release everything the guard held.
    pub fn remove(mut self) {
        self.uninstall();
    }

    fn uninstall(&mut self) {
        let Some(installation) = self.installation.take() else {
            return;
        };

        let original = installation.original_dispatch.borrow().clone();
        self.state.tracker.set_dispatch_task(original);
        installation
            .host
            .remove_visibility_listener(installation.listener);

        info!(tracker = self.state.tracker.name(), "Session guard removed");
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.uninstall();
    }
}

impl Tracker for SessionGuard {
    fn name(&self) -> &str {
        self.state.tracker.name()
    }

    fn send(&self, call: SendCall) -> Result<(), TrackerError> {
        if self.installation.is_none() {
            return self.state.tracker.send(call);
        }
        self.state.send(call)
    }

    fn dispatch_task(&self) -> DispatchTask {
        self.state.tracker.dispatch_task()
    }

    /// While active, replaces the task the recording wrapper forwards to, so
    /// hits keep refreshing the last-hit time. `remove` restores this task.
    fn set_dispatch_task(&self, task: DispatchTask) {
        match &self.installation {
            Some(installation) => *installation.original_dispatch.borrow_mut() = task,
            None => self.state.tracker.set_dispatch_task(task),
        }
    }
}

/// Dispatch task that forwards to `original` and then records the hit time
fn recording_task(
    original: Rc<RefCell<DispatchTask>>,
    clock: Rc<dyn Clock>,
    last_hit_time: Rc<Cell<i64>>,
) -> DispatchTask {
    Rc::new(move |model: &HitModel| -> Result<(), TrackerError> {
        let task = original.borrow().clone();
        task(model)?;

        let now = clock.now_ms();
        last_hit_time.set(last_hit_time.get().max(now));
        trace!(
            hit_type = model.hit_type().unwrap_or_default(),
            last_hit_time = now,
            "Recorded hit time"
        );
        Ok(())
    })
}
