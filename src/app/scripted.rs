use super::{PlaceSnapApp, ShutdownReason};
use crate::error::{PlaceSnapError, Result};
use crate::location::QueryStatus;
use tracing::{error, info, warn};

const SCRIPTED_DESCRIPTION: &str = "Checked in with placesnap";

impl PlaceSnapApp {
    /// One unattended check-in: locate, capture, describe, submit, shut down.
    ///
    /// Returns the process exit code; 0 only if the gateway accepted the check-in.
    pub async fn run_scripted(&mut self) -> Result<i32> {
        let session = self
            .session
            .clone()
            .ok_or_else(|| PlaceSnapError::system("Capture session not initialized"))?;

        let outcome = async {
            let query = self.locator.resolve().await;
            match query.status {
                QueryStatus::Resolved => info!("Location: {}", query.address.unwrap_or_default()),
                status => warn!("Location {:?}: {:?}", status, query.error.or(query.address)),
            }

            session.capture().await?;
            session.edit_description(SCRIPTED_DESCRIPTION)?;

            let ticket = session.submit()?;
            info!("Uploading check-in (attempt {})", ticket.attempt());
            Ok::<_, PlaceSnapError>(ticket.outcome().await?)
        }
        .await;

        let (reason, mut exit_code) = match outcome {
            Ok(id) => {
                println!("✓ Check-in uploaded: {}", id);
                (ShutdownReason::Completed, 0)
            }
            Err(e) => {
                error!("Scripted check-in failed: {}", e);
                eprintln!("✗ Check-in failed: {}", e);
                (ShutdownReason::Error(e.to_string()), 1)
            }
        };

        info!("Shutdown initiated: {}", reason);
        drop(session);
        if self.shutdown().await? != 0 {
            exit_code = 1;
        }
        Ok(exit_code)
    }
}
