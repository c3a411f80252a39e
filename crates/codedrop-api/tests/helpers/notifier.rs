use async_trait::async_trait;
use codedrop_services::{AccessNotice, Notifier, NotifyError};
use std::sync::Mutex;

/// Keeps every notice so tests can read the access code a recipient was sent.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<AccessNotice>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<AccessNotice> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &AccessNotice) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}
