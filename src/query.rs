use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ClientError, Result};
use crate::models::{QueryPayload, QueryRequest, QueryResponse};
use crate::tracker::{Completion, RequestTracker};
use crate::transport::Transport;

const ASK_PATH: &str = "/ask";
const ASK_FAILED: &str = "Error asking query.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub loading: bool,
    pub response: Option<QueryResponse>,
    pub error: Option<String>,
}

/// Asks the knowledge base a question and keeps the latest answer.
pub struct QueryClient {
    tx: Arc<dyn Transport>,
    tracker: RequestTracker,
    state: Mutex<QueryState>,
}

impl QueryClient {
    pub fn new(tx: Arc<dyn Transport>) -> Self {
        Self {
            tx,
            tracker: RequestTracker::new(),
            state: Mutex::new(QueryState::default()),
        }
    }

    pub fn state(&self) -> QueryState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send `request` to `/ask`; each call replaces the previous answer or
    /// error.
    ///
    /// Blank text fails validation without a request. A response that
    /// arrives after a newer `ask` has started is dropped and reported as
    /// [`Completion::Superseded`].
    pub async fn ask(&self, request: QueryRequest) -> Result<Completion<QueryResponse>> {
        let token = self.tracker.issue();

        {
            let mut state = self.lock();
            state.response = None;
            if let Err(e) = request.validate() {
                state.loading = false;
                state.error = Some(e.user_message(ASK_FAILED));
                return Err(e);
            }
            state.loading = true;
            state.error = None;
        }

        tracing::info!(top_k = request.result_count, "Asking: {}", request.text);

        let body = QueryPayload {
            query: &request.text,
            top_k: request.result_count,
        };
        let result = match serde_json::to_value(&body) {
            Ok(body) => self.tx.post_json(ASK_PATH, &body).await,
            Err(e) => Err(e.into()),
        };
        let result = result.and_then(|value| {
            serde_json::from_value::<QueryResponse>(value).map_err(|e| {
                ClientError::Transport(format!("Malformed response from {ASK_PATH}: {e}"))
            })
        });

        let mut state = self.lock();
        if !self.tracker.is_current(token) {
            tracing::debug!("Discarding superseded answer");
            return Ok(Completion::Superseded);
        }
        state.loading = false;

        match result {
            Ok(response) => {
                tracing::info!(references = response.references.len(), "Answer received");
                state.error = None;
                state.response = Some(response.clone());
                Ok(Completion::Applied(response))
            }
            Err(e) => {
                tracing::warn!("Query failed: {}", e);
                state.response = None;
                state.error = Some(e.user_message(ASK_FAILED));
                Err(e)
            }
        }
    }
}
