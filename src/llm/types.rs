//! Extraction schema — the contract between the OCR text and the
//! answering stage. The extraction model (and structured vision
//! backends) return JSON that deserializes directly into this type.

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};

/// Did the captured text contain a multiple-choice question, and if so,
/// which one?
///
/// Invariant: `question_found == true` implies `question` is present and
/// `choices` is a non-empty list of strings; `question_found == false`
/// implies both are absent. [`ExtractionResult::validate`] enforces this
/// before anything reaches the answering stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub question_found: bool,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
}

impl ExtractionResult {
    /// A validated "nothing here" result.
    pub fn not_found() -> Self {
        Self { question_found: false, question: None, choices: None }
    }

    /// Enforce the schema invariant. A violating value is an error,
    /// never silently coerced to a "question not found" result.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.question_found {
            match &self.question {
                Some(q) if !q.trim().is_empty() => {}
                _ => return Err(ExtractionError::InvalidStructure("question")),
            }
            match &self.choices {
                Some(c) if !c.is_empty() && c.iter().all(|s| !s.trim().is_empty()) => {}
                _ => return Err(ExtractionError::InvalidStructure("choices")),
            }
        } else {
            if self.question.is_some() {
                return Err(ExtractionError::InvalidStructure("question"));
            }
            if self.choices.is_some() {
                return Err(ExtractionError::InvalidStructure("choices"));
            }
        }
        Ok(())
    }
}
