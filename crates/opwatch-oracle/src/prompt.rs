//! Prompt builders for live monitoring.
//!
//! The oracle holds no state between calls, so every prompt re-derives the
//! full session picture: the expected step definition, the cumulative
//! detected list with recent evidence, the remaining steps with the next
//! expected one flagged, and a bounded window of prior chunk analyses.

use opwatch_models::ReferenceStep;

/// An already-detected step, with an excerpt of its latest detection.
#[derive(Debug, Clone)]
pub struct DetectedEntry {
    pub step_number: u32,
    pub step_name: String,
    /// Most recent detection analysis, if retained
    pub last_seen: Option<String>,
}

/// A not-yet-detected step.
#[derive(Debug, Clone)]
pub struct RemainingEntry {
    pub step_number: u32,
    pub step_name: String,
    /// Whether this is the next expected step
    pub expected_next: bool,
}

/// Everything a chunk-analysis prompt needs to know about the session.
#[derive(Debug, Clone)]
pub struct ChunkPromptContext<'a> {
    pub procedure_name: &'a str,
    pub expected_step: &'a ReferenceStep,
    pub detected: Vec<DetectedEntry>,
    pub remaining: Vec<RemainingEntry>,
    /// Raw prior chunk analyses, oldest first
    pub history: &'a [String],
    /// Number of frames in the clip under analysis
    pub clip_frames: usize,
}

/// Response-format block for chunked clip analysis. The parser depends on
/// these exact labels.
const CHUNK_RESPONSE_FORMAT: &str = "\
**RESPONSE FORMAT:**
Detected Step: [number] - [name]
Action Being Performed: [what the operator is doing - compare to step description]
Instruments Visible: [list - compare to required instruments]
Anatomical Landmarks: [list - compare to expected landmarks]
Matches Expected: [yes/no - does video match the reference definition?]
Step Progress: [just-started/in-progress/nearing-completion/completed]
Completion Evidence: [required if completed - what proves the step description is fulfilled? else \"N/A\"]
Analysis: [brief observation comparing video to the reference procedure]";

fn truncated(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut)
    }
}

/// Render the full definition of the expected step.
fn step_detail(step: &ReferenceStep) -> String {
    let duration = match (step.expected_duration_min, step.expected_duration_max) {
        (Some(min), Some(max)) => format!("{}-{} minutes", min, max),
        (Some(min), None) => format!("at least {} minutes", min),
        (None, Some(max)) => format!("up to {} minutes", max),
        (None, None) => "Not specified".to_string(),
    };
    let critical = if step.is_critical {
        "YES - Extra caution required"
    } else {
        "No"
    };
    let instruments = if step.instruments_required.is_empty() {
        "Not specified".to_string()
    } else {
        step.instruments_required.join(", ")
    };
    let landmarks = if step.anatomical_landmarks.is_empty() {
        "Not specified".to_string()
    } else {
        step.anatomical_landmarks.join(", ")
    };

    format!(
        "**Current Expected Step {}: {}**\n\
         - Description: {}\n\
         - Expected Duration: {}\n\
         - Critical Step: {}\n\
         - Required Instruments: {}\n\
         - Anatomical Landmarks: {}\n\
         - Visual Cues: {}",
        step.step_number,
        step.step_name,
        if step.description.is_empty() {
            "N/A"
        } else {
            step.description.as_str()
        },
        duration,
        critical,
        instruments,
        landmarks,
        step.visual_cues.as_deref().unwrap_or("Not specified"),
    )
}

/// Extract the key signal lines from a prior analysis for the history block.
fn history_summary(index: usize, analysis: &str) -> String {
    let mut lines = vec![format!("Chunk {}:", index)];
    for label in ["Detected Step:", "Step Progress:", "Matches Expected:"] {
        let line = analysis
            .lines()
            .find(|l| l.contains(label))
            .unwrap_or("Unknown");
        lines.push(format!("  {}", line.trim()));
    }
    lines.join("\n")
}

/// Build the prompt for one chunk of a live monitoring session.
pub fn build_chunk_prompt(ctx: &ChunkPromptContext<'_>) -> String {
    let detected_context = if ctx.detected.is_empty() {
        "None yet".to_string()
    } else {
        ctx.detected
            .iter()
            .map(|d| {
                let mut line = format!("[done] Step {}: {}", d.step_number, d.step_name);
                if let Some(ref seen) = d.last_seen {
                    line.push_str(&format!(" (Last seen: {})", truncated(seen, 100)));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let remaining_context = if ctx.remaining.is_empty() {
        "All steps detected!".to_string()
    } else {
        ctx.remaining
            .iter()
            .map(|r| {
                let mut line = format!("Step {}: {}", r.step_number, r.step_name);
                if r.expected_next {
                    line.push_str(" <- EXPECTED NEXT");
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let cumulative_note = if ctx.detected.is_empty() {
        String::new()
    } else {
        let numbers = ctx
            .detected
            .iter()
            .map(|d| d.step_number.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "\n**IMPORTANT:** Steps {} have been detected and should REMAIN detected. \
             Focus on detecting remaining steps.\n",
            numbers
        )
    };

    let history_context = if ctx.history.is_empty() {
        String::new()
    } else {
        let lines = ctx
            .history
            .iter()
            .enumerate()
            .map(|(i, h)| history_summary(i + 1, h))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "\n**Analysis History (Last {} chunks):**\n{}\n",
            ctx.history.len(),
            lines
        )
    };

    format!(
        "Analyze this {}-second procedural video clip from {}.\n\n\
         **REFERENCE PROCEDURE CONTEXT:**\n{}\n\n\
         **DETECTED STEPS (CUMULATIVE - ALREADY IDENTIFIED):**\n{}\n{}\
         **REMAINING STEPS (FOCUS ON DETECTING THESE):**\n{}\n{}\
         **CRITICAL RULES - CUMULATIVE TRACKING:**\n\
         1. This is CUMULATIVE analysis - once a step is detected, it REMAINS detected forever\n\
         2. **FOCUS ONLY on remaining steps** - detected steps are already confirmed\n\
         3. Compare video against the REFERENCE PROCEDURE definition above\n\
         4. Steps take MINUTES (50-200+ frames at 1 FPS), not seconds\n\
         5. Mark \"completed\" ONLY when you see clear evidence the step description is fulfilled\n\
         6. \"in-progress\" is default - be conservative\n\
         7. Verify actual actions match the step description, not just instrument presence\n\
         8. Review the analysis history and reference definition before making status updates\n\
         9. Match visible instruments and anatomical landmarks against requirements\n\
         10. **DO NOT re-detect already detected steps** - they remain in the detected list automatically\n\n\
         {}\n\n\
         Analyze the video clip and respond:",
        ctx.clip_frames,
        ctx.procedure_name,
        step_detail(ctx.expected_step),
        detected_context,
        cumulative_note,
        remaining_context,
        history_context,
        CHUNK_RESPONSE_FORMAT,
    )
}

/// Context for the per-frame (sequential) analysis path.
#[derive(Debug, Clone)]
pub struct FramePromptContext<'a> {
    pub procedure_name: &'a str,
    pub expected_step: &'a ReferenceStep,
    /// Names of steps already completed by the sequential cursor
    pub completed: Vec<String>,
    /// Remaining steps still ahead of (or at) the cursor
    pub remaining: Vec<RemainingEntry>,
    /// Previous frame's full analysis, for temporal continuity
    pub previous_analysis: Option<&'a str>,
}

/// Response-format block for per-frame analysis.
const FRAME_RESPONSE_FORMAT: &str = "\
**RESPONSE FORMAT (REQUIRED):**
Detected Step: [number] - [name]
Action Being Performed: [specific action you observe - be detailed]
Instruments Visible: [list what you actually see]
Anatomical Landmarks: [list what you actually see]
Matches Expected: [yes/no - does current frame match expected step?]
Step Progress: [just-started / in-progress / nearing-completion / completed]
Completion Evidence: [REQUIRED if marking completed - what proves it's done? If not complete, write \"N/A\"]
Sequence Status: [in-sequence/out-of-sequence/skipped-step]
Repeated Completed Step: [yes/no]
Analysis: [detailed observation - what is the operator doing RIGHT NOW?]";

/// Build the prompt for a single-frame analysis (sequential mode).
pub fn build_frame_prompt(ctx: &FramePromptContext<'_>) -> String {
    let completed_context = if ctx.completed.is_empty() {
        "None yet".to_string()
    } else {
        ctx.completed
            .iter()
            .map(|name| format!("{} - COMPLETED", name))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let remaining_context = ctx
        .remaining
        .iter()
        .map(|r| {
            let mut line = format!("Step {}: {}", r.step_number, r.step_name);
            if r.expected_next {
                line.push_str(" (EXPECTED NOW)");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    let previous_context = match ctx.previous_analysis {
        Some(prev) => format!(
            "\n**PREVIOUS FRAME ANALYSIS (for context awareness):**\n{}\n\n\
             Use it to judge continuity: whether the same action is continuing \
             or a new action has started.\n",
            prev
        ),
        None => String::new(),
    };

    format!(
        "You are monitoring a live procedure: {}\n\n\
         **COMPLETED STEPS (DO NOT MATCH AGAINST THESE):**\n{}\n\n\
         **REMAINING STEPS TO PERFORM:**\n{}\n\n\
         {}\n{}\n\
         **COMPLETION RULES:**\n\
         1. A step is NOT complete just because matching instruments or landmarks are visible\n\
         2. Mark \"Matches Expected: yes\" only when the expected step is actively being performed\n\
         3. Mark Step Progress \"completed\" only with explicit completion evidence\n\
         4. When unsure, mark \"in-progress\" - be conservative\n\
         5. Only report what you actually see; if the view is unclear, say so in Analysis\n\n\
         {}",
        ctx.procedure_name,
        completed_context,
        remaining_context,
        step_detail(ctx.expected_step),
        previous_context,
        FRAME_RESPONSE_FORMAT,
    )
}
