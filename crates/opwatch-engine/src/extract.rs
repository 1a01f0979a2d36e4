//! One-shot procedure extraction.
//!
//! Turns a recorded video into a stored reference procedure with a single
//! schema-constrained oracle call. No queueing or tracker state is involved;
//! failures here propagate to the caller.

use std::sync::Arc;

use tracing::info;

use opwatch_models::ProcedureId;
use opwatch_oracle::{extraction_prompt, extraction_schema, parse_extraction, VideoOracle};
use opwatch_store::ProcedureRepository;

use crate::error::EngineResult;

/// Summary returned after a successful extraction.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub procedure_id: ProcedureId,
    pub procedure_name: String,
    pub procedure_type: String,
    pub steps_count: usize,
}

/// Extracts reference procedures from recorded videos.
pub struct ProcedureExtractor {
    oracle: Arc<dyn VideoOracle>,
    procedures: Arc<dyn ProcedureRepository>,
}

impl ProcedureExtractor {
    pub fn new(oracle: Arc<dyn VideoOracle>, procedures: Arc<dyn ProcedureRepository>) -> Self {
        Self { oracle, procedures }
    }

    /// Analyze a recording and persist the extracted procedure.
    pub async fn extract_and_store(&self, video: &[u8]) -> EngineResult<ExtractionOutcome> {
        let raw = self
            .oracle
            .analyze_clip_structured(video, &extraction_prompt(), extraction_schema())
            .await?;

        let extracted = parse_extraction(&raw)?;
        let procedure = extracted.into_procedure();

        self.procedures.create(&procedure).await?;

        info!(
            "Extracted procedure '{}' ({}) with {} steps",
            procedure.procedure_name,
            procedure.procedure_type,
            procedure.steps.len()
        );

        Ok(ExtractionOutcome {
            procedure_id: procedure.procedure_id.clone(),
            procedure_name: procedure.procedure_name.clone(),
            procedure_type: procedure.procedure_type.clone(),
            steps_count: procedure.steps.len(),
        })
    }
}
