use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::gate::source_label;
use crate::models::{SessionConfig, SetupPayload};
use crate::tracker::{Completion, RequestTracker};
use crate::transport::Transport;

const SETUP_PATH: &str = "/setup";
const SETUP_FAILED: &str = "Setup failed.";

/// Result of a successful setup, handed to the session gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    pub config: SessionConfig,
    pub source_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Submits the chosen models and content source to the backend.
pub struct SetupCoordinator {
    tx: Arc<dyn Transport>,
    tracker: RequestTracker,
    status: Mutex<SetupStatus>,
}

impl SetupCoordinator {
    pub fn new(tx: Arc<dyn Transport>) -> Self {
        Self {
            tx,
            tracker: RequestTracker::new(),
            status: Mutex::new(SetupStatus::default()),
        }
    }

    pub fn status(&self) -> SetupStatus {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SetupStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and send `config` to `/setup`.
    ///
    /// Blank fields fail with a validation error before anything is sent.
    /// Only a 200 reply counts as success; its body is ignored.
    /// On failure the user-facing message is also stored in [`SetupStatus`].
    /// `loading` is cleared on every exit path of the latest submission.
    pub async fn submit(&self, config: SessionConfig) -> Result<Completion<SetupOutcome>> {
        let token = self.tracker.issue();

        if let Err(e) = config.validate() {
            let mut status = self.lock();
            status.loading = false;
            status.error = Some(e.user_message(SETUP_FAILED));
            return Err(e);
        }

        {
            let mut status = self.lock();
            status.loading = true;
            status.error = None;
        }

        tracing::info!(
            chat_model = %config.chat_model,
            embed_model = %config.embed_model,
            source = %config.content_source_path,
            "Submitting setup"
        );

        let result = match serde_json::to_value(SetupPayload::from(&config)) {
            Ok(body) => self.tx.post(SETUP_PATH, &body).await,
            Err(e) => Err(e.into()),
        };
        let result = result.and_then(|reply| match reply.status {
            200 => Ok(()),
            _ => Err(reply.into_service_error(SETUP_PATH)),
        });

        let mut status = self.lock();
        if !self.tracker.is_current(token) {
            tracing::debug!("Discarding superseded setup response");
            return Ok(Completion::Superseded);
        }
        status.loading = false;

        match result {
            Ok(()) => {
                status.error = None;
                let label = source_label(&config.content_source_path);
                tracing::info!(%label, "Setup succeeded");
                Ok(Completion::Applied(SetupOutcome {
                    config,
                    source_label: label,
                }))
            }
            Err(e) => {
                tracing::warn!("Setup failed: {}", e);
                status.error = Some(e.user_message(SETUP_FAILED));
                Err(e)
            }
        }
    }
}
