//! In-memory store implementation.
//!
//! Backs tests and single-process deployments. All three repositories share
//! one [`MemoryStore`]; clone the `Arc` you wrap it in to hand the same
//! handle to multiple owners.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::RwLock;
use tracing::info;

use opwatch_models::{Alert, ProcedureId, ReferenceProcedure, Session, SessionId, SessionStatus};

use crate::error::{StoreError, StoreResult};
use crate::repos::{AlertRepository, ProcedureRepository, SessionRepository};

/// In-memory implementation of all repository traits.
#[derive(Default)]
pub struct MemoryStore {
    procedures: RwLock<HashMap<String, ReferenceProcedure>>,
    sessions: RwLock<HashMap<String, Session>>,
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcedureRepository for MemoryStore {
    async fn create(&self, procedure: &ReferenceProcedure) -> StoreResult<()> {
        let mut procedures = self.procedures.write().await;
        let key = procedure.procedure_id.as_str().to_string();
        if procedures.contains_key(&key) {
            return Err(StoreError::already_exists(key));
        }
        procedures.insert(key, procedure.clone());
        info!("Stored procedure {}", procedure.procedure_id);
        Ok(())
    }

    async fn get(&self, procedure_id: &ProcedureId) -> StoreResult<Option<ReferenceProcedure>> {
        let procedures = self.procedures.read().await;
        Ok(procedures.get(procedure_id.as_str()).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<ReferenceProcedure>> {
        let procedures = self.procedures.read().await;
        Ok(procedures.values().cloned().collect())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, session: &Session) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id.as_str()).cloned())
    }

    async fn update_current_step(&self, session_id: &SessionId, step: usize) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id.as_str())
            .ok_or_else(|| StoreError::not_found(session_id.as_str()))?;
        session.current_step = step;
        Ok(())
    }

    async fn finalize(
        &self,
        session_id: &SessionId,
        end_time: DateTime<Utc>,
        status: SessionStatus,
        frame_count: u64,
    ) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id.as_str())
            .ok_or_else(|| StoreError::not_found(session_id.as_str()))?;
        session.end_time = Some(end_time);
        session.status = status;
        session.frame_count = frame_count;
        Ok(())
    }
}

#[async_trait]
impl AlertRepository for MemoryStore {
    async fn insert_batch(&self, batch: &[Alert]) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut alerts = self.alerts.write().await;
        alerts.extend_from_slice(batch);
        counter!("opwatch_alerts_persisted_total").increment(batch.len() as u64);
        Ok(())
    }

    async fn list_for_session(&self, session_id: &SessionId) -> StoreResult<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|a| a.session_id == *session_id)
            .cloned()
            .collect())
    }

    async fn acknowledge(&self, alert_id: &str) -> StoreResult<()> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.alert_id == alert_id)
            .ok_or_else(|| StoreError::not_found(alert_id))?;
        alert.acknowledged = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opwatch_models::{AlertSeverity, AlertType, ReferenceStep};

    fn procedure() -> ReferenceProcedure {
        ReferenceProcedure::new(
            "Lap chole",
            "laparoscopic",
            vec![ReferenceStep::named(1, "Port placement")],
        )
    }

    #[tokio::test]
    async fn test_procedure_create_get() {
        let store = MemoryStore::new();
        let procedure = procedure();
        let id = procedure.procedure_id.clone();

        ProcedureRepository::create(&store, &procedure).await.unwrap();
        let fetched = ProcedureRepository::get(&store, &id).await.unwrap();
        assert_eq!(fetched.unwrap().procedure_name, "Lap chole");
    }

    #[tokio::test]
    async fn test_procedure_duplicate_rejected() {
        let store = MemoryStore::new();
        let procedure = procedure();

        ProcedureRepository::create(&store, &procedure).await.unwrap();
        let result = ProcedureRepository::create(&store, &procedure).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_session_finalize() {
        let store = MemoryStore::new();
        let session = Session::new(ProcedureId::from("p1"), "op-1");
        let id = session.session_id.clone();

        SessionRepository::create(&store, &session).await.unwrap();
        store
            .finalize(&id, Utc::now(), SessionStatus::Completed, 128)
            .await
            .unwrap();

        let stored = SessionRepository::get(&store, &id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.frame_count, 128);
        assert!(stored.end_time.is_some());
    }

    #[tokio::test]
    async fn test_alert_batch_and_acknowledge() {
        let store = MemoryStore::new();
        let session_id = SessionId::from_string("s1");
        let alert = Alert::new(
            session_id.clone(),
            AlertType::StepSkipped,
            AlertSeverity::High,
            "Step 2 was skipped",
        );
        let alert_id = alert.alert_id.clone();

        store.insert_batch(&[alert]).await.unwrap();
        store.acknowledge(&alert_id).await.unwrap();

        let listed = store.list_for_session(&session_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].acknowledged);
    }

    #[tokio::test]
    async fn test_unknown_session_update_fails() {
        let store = MemoryStore::new();
        let result = store
            .update_current_step(&SessionId::from_string("missing"), 3)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
