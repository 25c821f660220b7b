//! Background estimation task.
//!
//! Estimation runs off the voting path: a request is fire-and-forget, the
//! outcome (success or failure) arrives later as an [`EstimationEvent`].
//! At most one estimation per story runs at a time; a request for a story
//! already in flight is a no-op.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::reasoner::Reasoner;
use super::{Estimation, EstimationError, estimate_story};
use crate::db::Db;
use crate::embedder::EmbeddingProvider;

/// Completion notification for one estimation request.
#[derive(Debug)]
pub struct EstimationEvent {
    pub story_id: i64,
    pub result: Result<Estimation, EstimationError>,
}

/// Retrieval and reasoning knobs carried into each background run.
#[derive(Debug, Clone, Copy)]
pub struct EstimationSettings {
    pub top_k: usize,
    pub min_similarity: f32,
    pub max_tokens: u32,
}

pub struct EstimationService {
    handle: Handle,
    db_path: String,
    provider: Arc<dyn EmbeddingProvider>,
    reasoner: Arc<dyn Reasoner>,
    settings: EstimationSettings,
    in_flight: Arc<Mutex<HashSet<i64>>>,
    events: mpsc::UnboundedSender<EstimationEvent>,
}

impl EstimationService {
    /// Create the service and the receiver its completion events arrive on.
    ///
    /// Each background run opens its own connection to `db_path`; the
    /// service never shares a connection across threads.
    pub fn new(
        handle: Handle,
        db_path: String,
        provider: Arc<dyn EmbeddingProvider>,
        reasoner: Arc<dyn Reasoner>,
        settings: EstimationSettings,
    ) -> (Self, mpsc::UnboundedReceiver<EstimationEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let service = Self {
            handle,
            db_path,
            provider,
            reasoner,
            settings,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            events,
        };
        (service, receiver)
    }

    /// Request an estimation for `story_id`. Returns `false` without doing
    /// anything when one is already in flight for that story.
    pub fn request(&self, story_id: i64) -> bool {
        {
            let mut in_flight = match self.in_flight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !in_flight.insert(story_id) {
                debug!("Estimation for story {story_id} already in flight");
                return false;
            }
        }

        let db_path = self.db_path.clone();
        let provider = Arc::clone(&self.provider);
        let reasoner = Arc::clone(&self.reasoner);
        let settings = self.settings;
        let in_flight = Arc::clone(&self.in_flight);
        let events = self.events.clone();

        self.handle.spawn_blocking(move || {
            let result = Db::open(&db_path)
                .map_err(EstimationError::from)
                .and_then(|db| {
                    estimate_story(
                        &db,
                        provider.as_ref(),
                        reasoner.as_ref(),
                        story_id,
                        settings.top_k,
                        settings.min_similarity,
                        settings.max_tokens,
                    )
                });

            if let Err(ref e) = result {
                warn!("Estimation for story {story_id} failed: {e}");
            }

            match in_flight.lock() {
                Ok(mut guard) => {
                    guard.remove(&story_id);
                }
                Err(poisoned) => {
                    poisoned.into_inner().remove(&story_id);
                }
            }
            // Receiver may be gone during shutdown
            let _ = events.send(EstimationEvent { story_id, result });
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::story::StoryChunker;
    use crate::embedder::MockProvider;
    use crate::pipeline;

    /// Reasoner that blocks until released, for in-flight assertions.
    struct GateReasoner {
        gate: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl Reasoner for GateReasoner {
        fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, EstimationError> {
            let gate = self.gate.lock().unwrap();
            gate.recv().unwrap();
            Ok("STORY POINTS: 5".to_string())
        }

        fn model_id(&self) -> String {
            "gated".to_string()
        }
    }

    fn settings() -> EstimationSettings {
        EstimationSettings {
            top_k: 5,
            min_similarity: -1.0,
            max_tokens: 1024,
        }
    }

    fn seed_db(path: &str) -> i64 {
        let db = Db::open(path).unwrap();
        let provider = MockProvider::new(16);
        let strategy = StoryChunker::default();

        for (title, points) in [("Login page", 5u32), ("Signup page", 8)] {
            let id = db
                .create_story(title, Some("Some description."), "alice", Some("archive"))
                .unwrap();
            db.complete_story(id, points).unwrap();
        }
        pipeline::process_stories(&db, &provider, &strategy).unwrap();

        db.create_story("New login flow", None, "alice", None).unwrap()
    }

    #[test]
    fn test_background_estimation_completes() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db").to_string_lossy().to_string();
        let story_id = seed_db(&db_path);

        let (release, gate) = std::sync::mpsc::channel();
        let reasoner = Arc::new(GateReasoner {
            gate: Mutex::new(gate),
        });
        let (service, mut events) = EstimationService::new(
            runtime.handle().clone(),
            db_path.clone(),
            Arc::new(MockProvider::new(16)),
            reasoner,
            settings(),
        );

        assert!(service.request(story_id));
        // Same story while in flight: no-op
        assert!(!service.request(story_id));

        release.send(()).unwrap();
        let event = events.blocking_recv().unwrap();
        assert_eq!(event.story_id, story_id);
        assert_eq!(event.result.unwrap().points, 5);

        // Completed stories can be re-requested
        release.send(()).unwrap();
        assert!(service.request(story_id));
        assert!(events.blocking_recv().unwrap().result.is_ok());

        // Result landed in the store
        let db = Db::open(&db_path).unwrap();
        assert_eq!(db.latest_estimation(story_id).unwrap().unwrap().points, 5);
    }

    #[test]
    fn test_failure_is_an_event_not_a_panic() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db").to_string_lossy().to_string();
        // Schema only: no archive, so estimation has no evidence
        Db::open(&db_path).unwrap();

        let (service, mut events) = EstimationService::new(
            runtime.handle().clone(),
            db_path,
            Arc::new(MockProvider::new(16)),
            Arc::new(super::super::reasoner::ScriptedReasoner::new("STORY POINTS: 5")),
            settings(),
        );

        assert!(service.request(77));
        let event = events.blocking_recv().unwrap();
        assert_eq!(event.story_id, 77);
        assert!(matches!(
            event.result,
            Err(EstimationError::StoryNotFound(77))
        ));
    }
}
