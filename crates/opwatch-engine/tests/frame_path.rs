//! Tests for the per-frame sequential path and the extraction pipeline.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use opwatch_engine::{EventBus, FrameMonitor, MonitorContext, ProcedureExtractor};
use opwatch_media::{ClipEncoder, MediaResult};
use opwatch_models::{AlertType, ReferenceProcedure, ReferenceStep, SessionId};
use opwatch_oracle::{OracleResult, VideoOracle};
use opwatch_store::{AlertRepository, MemoryStore, ProcedureRepository};

struct QueueOracle {
    responses: Mutex<VecDeque<String>>,
}

impl QueueOracle {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
        }
    }

    async fn pop(&self) -> String {
        self.responses.lock().await.pop_front().unwrap_or_default()
    }
}

#[async_trait]
impl VideoOracle for QueueOracle {
    async fn analyze_clip(&self, _video: &[u8], _prompt: &str) -> OracleResult<String> {
        Ok(self.pop().await)
    }

    async fn analyze_frame(&self, _image: &[u8], _prompt: &str) -> OracleResult<String> {
        Ok(self.pop().await)
    }

    async fn analyze_clip_structured(
        &self,
        _video: &[u8],
        _prompt: &str,
        _schema: serde_json::Value,
    ) -> OracleResult<String> {
        Ok(self.pop().await)
    }
}

struct NullEncoder;

#[async_trait]
impl ClipEncoder for NullEncoder {
    async fn encode(&self, _frames: &[Vec<u8>]) -> MediaResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn procedure() -> ReferenceProcedure {
    let steps = (1..=4)
        .map(|n| ReferenceStep::named(n, format!("Step {}", n)))
        .collect();
    ReferenceProcedure::new("Appendectomy", "laparoscopic", steps)
}

fn context(oracle: Arc<dyn VideoOracle>, store: Arc<MemoryStore>) -> Arc<MonitorContext> {
    Arc::new(MonitorContext {
        oracle,
        encoder: Arc::new(NullEncoder),
        procedures: store.clone(),
        sessions: store.clone(),
        alerts: store,
    })
}

#[tokio::test]
async fn test_sequential_completion_flow() {
    let oracle = Arc::new(QueueOracle::new(vec![
        // Step 1 observed but not complete
        "Detected Step: 1\nMatches Expected: yes\nStep Progress: in-progress\nCompletion Evidence: N/A",
        // Step 1 completed with evidence
        "Detected Step: 1\nMatches Expected: yes\nStep Progress: completed\nCompletion Evidence: trocars secured",
    ]));
    let store = Arc::new(MemoryStore::new());
    let ctx = context(oracle, store.clone());

    let mut monitor = FrameMonitor::new(
        &procedure(),
        SessionId::from_string("frame-session"),
        ctx,
        EventBus::new(16),
    );

    monitor.analyze_frame(b"frame-1").await.unwrap();
    assert_eq!(monitor.current_step_index(), 0);

    monitor.analyze_frame(b"frame-2").await.unwrap();
    assert_eq!(monitor.current_step_index(), 1);
}

#[tokio::test]
async fn test_sequential_jump_raises_skip_alerts() {
    let oracle = Arc::new(QueueOracle::new(vec![
        "Detected Step: 3\nMatches Expected: yes\nStep Progress: in-progress",
    ]));
    let store = Arc::new(MemoryStore::new());
    let ctx = context(oracle, store.clone());
    let session_id = SessionId::from_string("frame-session");

    let mut monitor = FrameMonitor::new(&procedure(), session_id.clone(), ctx, EventBus::new(16));
    monitor.analyze_frame(b"frame-1").await.unwrap();

    // Cursor jumped from 0 to 2; steps 0 and 1 were skipped
    assert_eq!(monitor.current_step_index(), 2);
    let alerts = store.list_for_session(&session_id).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.alert_type == AlertType::StepSkipped));
}

#[tokio::test]
async fn test_manual_advance() {
    let oracle = Arc::new(QueueOracle::new(vec![]));
    let store = Arc::new(MemoryStore::new());
    let ctx = context(oracle, store);

    let mut monitor = FrameMonitor::new(
        &procedure(),
        SessionId::from_string("frame-session"),
        ctx,
        EventBus::new(16),
    );

    monitor.advance_step();
    assert_eq!(monitor.current_step_index(), 1);
    assert!(!monitor.is_complete());
}

#[tokio::test]
async fn test_extraction_stores_procedure() {
    let response = r#"{
        "procedure_name": "Laparoscopic appendectomy",
        "procedure_type": "laparoscopic",
        "total_duration_avg": 2400,
        "steps": [
            {"step_number": 1, "step_name": "Port placement", "description": "Insert ports", "is_critical": false},
            {"step_number": 2, "step_name": "Mesoappendix division", "description": "Divide vessels", "is_critical": true}
        ]
    }"#;
    let oracle = Arc::new(QueueOracle::new(vec![response]));
    let store = Arc::new(MemoryStore::new());

    let extractor = ProcedureExtractor::new(oracle, store.clone());
    let outcome = extractor.extract_and_store(b"recording").await.unwrap();

    assert_eq!(outcome.procedure_name, "Laparoscopic appendectomy");
    assert_eq!(outcome.steps_count, 2);

    let stored = ProcedureRepository::get(store.as_ref(), &outcome.procedure_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.steps[1].step_name, "Mesoappendix division");
    assert!(stored.steps[1].is_critical);
    // Durations are normalized from seconds to minutes
    assert_eq!(stored.total_duration_avg, Some(40.0));
}
