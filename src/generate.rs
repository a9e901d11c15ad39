use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::models::{GenerationBody, GenerationRequest};
use crate::normalize::{DisplayBlock, GenerationResult, display_all, normalize};
use crate::tracker::{Completion, RequestTracker};
use crate::transport::Transport;

const GENERATE_FAILED: &str = "Something went wrong.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationState {
    pub loading: bool,
    pub results: Vec<GenerationResult>,
    pub error: Option<String>,
}

impl GenerationState {
    pub fn blocks(&self) -> Vec<DisplayBlock> {
        display_all(&self.results)
    }
}

/// Requests generated content (NPCs, locations, ...) and keeps the latest
/// normalized results.
pub struct GenerationClient {
    tx: Arc<dyn Transport>,
    tracker: RequestTracker,
    state: Mutex<GenerationState>,
}

impl GenerationClient {
    pub fn new(tx: Arc<dyn Transport>) -> Self {
        Self {
            tx,
            tracker: RequestTracker::new(),
            state: Mutex::new(GenerationState::default()),
        }
    }

    pub fn state(&self) -> GenerationState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// POST to `/gen/{category}` and normalize the reply into a list of
    /// results, whether the backend sent one item or many.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<Completion<Vec<GenerationResult>>> {
        let token = self.tracker.issue();

        {
            let mut state = self.lock();
            state.results.clear();
            if let Err(e) = request.validate() {
                state.loading = false;
                state.error = Some(e.user_message(GENERATE_FAILED));
                return Err(e);
            }
            state.loading = true;
            state.error = None;
        }

        let path = request.category.endpoint();
        tracing::info!(
            category = %request.category,
            top_k = request.result_count,
            "Generating: {}",
            request.prompt
        );

        let body = GenerationBody {
            top_k: request.result_count,
            query: &request.prompt,
        };
        let result = match serde_json::to_value(&body) {
            Ok(body) => self.tx.post_json(&path, &body).await,
            Err(e) => Err(e.into()),
        };

        let mut state = self.lock();
        if !self.tracker.is_current(token) {
            tracing::debug!(category = %request.category, "Discarding superseded generation");
            return Ok(Completion::Superseded);
        }
        state.loading = false;

        match result {
            Ok(value) => {
                let results = normalize(value);
                tracing::info!(count = results.len(), "Generation received");
                state.error = None;
                state.results = results.clone();
                Ok(Completion::Applied(results))
            }
            Err(e) => {
                tracing::warn!(category = %request.category, "Generation failed: {}", e);
                state.results.clear();
                state.error = Some(e.user_message(GENERATE_FAILED));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::models::Category;
    use crate::normalize::FieldValue;
    use crate::transport::gated::GatedTransport;
    use crate::transport::{MockTransport, Reply};
    use serde_json::json;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_npc_list_is_normalized() {
        let mut mock = MockTransport::new();
        mock.expect_post_json()
            .withf(|path, body| path == "/gen/npc" && *body == json!({"top_k": 3, "query": ""}))
            .times(1)
            .returning(|_, _| Ok(json!({"npcs": [{"name": "Kael"}, {"name": "Lyra"}]})));
        let client = GenerationClient::new(Arc::new(mock));

        let request = GenerationRequest::new(Category::Npc, 3, "").expect("valid request");
        let results = client
            .generate(request)
            .await
            .expect("generation should succeed")
            .applied()
            .expect("only request is current");

        assert_eq!(results.len(), 2);
        let state = client.state();
        assert!(!state.loading);
        assert_eq!(state.error, None);

        let blocks = state.blocks();
        assert_eq!(blocks.len(), 2);
        for (block, name) in blocks.iter().zip(["Kael", "Lyra"]) {
            let DisplayBlock::Rows(rows) = block else {
                panic!("npc must render as rows");
            };
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].key, "name");
            assert_eq!(rows[0].value, FieldValue::Plain(name.to_string()));
        }
    }

    #[tokio::test]
    async fn test_single_item_is_wrapped() {
        let mut mock = MockTransport::new();
        mock.expect_post_json()
            .withf(|path, _| path == "/gen/location")
            .returning(|_, _| Ok(json!({"location": {"name": "Hollow", "danger": 3}})));
        let client = GenerationClient::new(Arc::new(mock));

        let request =
            GenerationRequest::new(Category::Location, 1, "a mossy cave").expect("valid");
        client.generate(request).await.expect("should succeed");

        assert_eq!(client.state().results.len(), 1);
    }

    #[tokio::test]
    async fn test_service_error_clears_results() {
        let mut mock = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_post_json()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(json!({"names": ["Kael"]})));
        mock.expect_post_json()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(ClientError::Service {
                    status: 500,
                    message: Some("model unavailable".to_string()),
                })
            });
        let client = GenerationClient::new(Arc::new(mock));

        let request = GenerationRequest::new(Category::Name, 1, "").expect("valid");
        client.generate(request.clone()).await.expect("first succeeds");
        client.generate(request).await.expect_err("second fails");

        let state = client.state();
        assert!(state.results.is_empty());
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("model unavailable"));
    }

    #[tokio::test]
    async fn test_out_of_range_count_sends_nothing() {
        let mut mock = MockTransport::new();
        mock.expect_post_json().times(0);
        let client = GenerationClient::new(Arc::new(mock));

        let request = GenerationRequest {
            category: Category::Item,
            result_count: 0,
            prompt: String::new(),
        };
        let err = client.generate(request).await.expect_err("must fail");

        assert!(err.is_validation());
        assert!(client.state().error.is_some());
    }

    #[tokio::test]
    async fn test_late_response_from_older_request_is_discarded() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let client = GenerationClient::new(Arc::new(GatedTransport::new([first_rx, second_rx])));

        let older = GenerationRequest::new(Category::Rumour, 1, "old").expect("valid");
        let newer = GenerationRequest::new(Category::Rumour, 1, "new").expect("valid");

        let (older_done, newer_done, _) = futures::join!(
            client.generate(older),
            client.generate(newer),
            async {
                assert!(client.state().loading);
                // Newest reply lands first, the stale one after it.
                let _ = second_tx.send(Ok(Reply::json(200, &json!({"rumour": "fresh"}))));
                tokio::task::yield_now().await;
                let _ = first_tx.send(Ok(Reply::json(200, &json!({"rumour": "stale"}))));
            }
        );

        assert_eq!(older_done.expect("no error"), Completion::Superseded);
        assert_eq!(
            newer_done.expect("no error"),
            Completion::Applied(vec![GenerationResult::Text("fresh".to_string())])
        );

        let state = client.state();
        assert!(!state.loading);
        assert_eq!(state.results, vec![GenerationResult::Text("fresh".to_string())]);
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_overwrite_newer_results() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let client = GenerationClient::new(Arc::new(GatedTransport::new([first_rx, second_rx])));

        let request = GenerationRequest::new(Category::Puzzle, 2, "").expect("valid");

        let (older_done, newer_done, _) = futures::join!(
            client.generate(request.clone()),
            client.generate(request.clone()),
            async {
                let _ = second_tx.send(Ok(Reply::json(
                    200,
                    &json!({"puzzles": ["A riddle", "A lever"]}),
                )));
                tokio::task::yield_now().await;
                let _ = first_tx.send(Err(ClientError::Transport("timed out".to_string())));
            }
        );

        assert!(matches!(older_done, Ok(Completion::Superseded)));
        assert!(newer_done.is_ok());

        let state = client.state();
        assert_eq!(state.results.len(), 2);
        assert_eq!(state.error, None);
    }
}
