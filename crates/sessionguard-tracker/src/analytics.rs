use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

use crate::{build_model, DispatchTask, HitModel, SendCall, Tracker, TrackerError, Transport};

/// Analytics tracker that builds hits from `send` arguments and hands them to
/// a [`Transport`] through a replaceable dispatch task
pub struct AnalyticsTracker {
    name: String,
    client_id: String,
    dispatch_task: RefCell<DispatchTask>,
}

impl AnalyticsTracker {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self::with_name("t0", transport)
    }

    pub fn with_name(name: &str, transport: Rc<dyn Transport>) -> Self {
        let task: DispatchTask = Rc::new(move |model: &HitModel| transport.deliver(model));
        Self {
            name: name.to_string(),
            client_id: uuid::Uuid::new_v4().to_string(),
            dispatch_task: RefCell::new(task),
        }
    }

    /// Random client id stamped on every hit as `clientId`
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl Tracker for AnalyticsTracker {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, call: SendCall) -> Result<(), TrackerError> {
        let mut model = build_model(&call)?;
        model.set("clientId", self.client_id.as_str());
        model.set("trackerName", self.name.as_str());

        debug!(
            tracker = %self.name,
            hit_type = model.hit_type().unwrap_or_default(),
            "Dispatching hit"
        );

        // Clone out of the cell so the task may replace itself while running
        let task = self.dispatch_task.borrow().clone();
        task(&model)
    }

    fn dispatch_task(&self) -> DispatchTask {
        self.dispatch_task.borrow().clone()
    }

    fn set_dispatch_task(&self, task: DispatchTask) {
        *self.dispatch_task.borrow_mut() = task;
    }
}
