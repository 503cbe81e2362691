use crate::error::UploadError;
use crate::upload::CheckinId;
use tokio::sync::oneshot;

/// Handle on a detached upload.
///
/// Dropping the ticket does not cancel the upload.
#[derive(Debug)]
pub struct UploadTicket {
    attempt: u64,
    receiver: oneshot::Receiver<Result<CheckinId, UploadError>>,
}

impl UploadTicket {
    pub(crate) fn new(
        attempt: u64,
        receiver: oneshot::Receiver<Result<CheckinId, UploadError>>,
    ) -> Self {
        Self { attempt, receiver }
    }

    /// 1-based submission counter within the session
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Wait for the gateway's answer
    pub async fn outcome(self) -> Result<CheckinId, UploadError> {
        self.receiver.await.unwrap_or_else(|_| {
            Err(UploadError::Transport {
                details: "upload task ended without a result".to_string(),
            })
        })
    }
}
