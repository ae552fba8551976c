use parking_lot::Mutex;
use std::collections::HashMap;

use crate::logic::report::Notice;
use crate::model::UserContext;

/// Where flash messages go until the next page is rendered
pub trait NotificationSink: Send + Sync {
    fn notify(&self, actor: &UserContext, notice: Notice);

    fn notify_success(&self, actor: &UserContext, message: &str) {
        self.notify(actor, Notice::success(message));
    }

    fn notify_error(&self, actor: &UserContext, message: &str) {
        self.notify(actor, Notice::error(message));
    }
}

/// Pending notices per user, drained when the admin page is next fetched
#[derive(Debug, Default)]
pub struct NoticeBoard {
    pending: Mutex<HashMap<String, Vec<Notice>>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the user's notices, oldest first
    pub fn drain(&self, actor: &UserContext) -> Vec<Notice> {
        self.pending
            .lock()
            .remove(&actor.user_id)
            .unwrap_or_default()
    }
}

impl NotificationSink for NoticeBoard {
    fn notify(&self, actor: &UserContext, notice: Notice) {
        self.pending
            .lock()
            .entry(actor.user_id.clone())
            .or_default()
            .push(notice);
    }
}
