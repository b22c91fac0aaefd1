//! Prompt constants for the extraction and answering models.
//!
//! These are the contract between quiz-glass and the models; the
//! extraction prompt doubles as the schema instruction for structured
//! vision backends.

/// Cap on the answering model's output. The answer UI is a one-liner
/// overlay; anything longer gets cut off anyway.
pub const ANSWER_MAX_TOKENS: u32 = 200;

/// EXTRACT system prompt — turns raw OCR text into the
/// `ExtractionResult` JSON schema.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"Analyze the following text extracted via OCR. Determine if it contains a multiple-choice question (MCQ).
Output a JSON object with the following structure:
{
  "question_found": boolean,
  "question": "The extracted question text." | null,
  "choices": ["A) Choice A text", "B) Choice B text", ...] | null
}
Set "question" and "choices" to null when "question_found" is false.
The text is extracted via OCR so it may contain errors; fix those errors in the output.
If there is code, include it in the question text.
Only output the JSON object. Do not include any other text or explanations.
Focus on identifying a clear question stem and distinct answer options (often labeled A, B, C, D or 1, 2, 3, 4).
If no clear MCQ is present, set "question_found" to false.
If there are multiple questions present, only return the first one."#;

/// ANSWER persona system prompt.
pub const ANSWERING_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant specializing in answering MCQs concisely.";

/// Prompt a multimodal vision model to do OCR + extraction in one shot,
/// emitting the same JSON schema as the extraction stage.
pub const VISION_EXTRACTION_PROMPT: &str = r#"The attached image is a screenshot. Read all visible text, then determine whether it contains a multiple-choice question (MCQ).
Output a JSON object with the following structure:
{
  "question_found": boolean,
  "question": "The extracted question text." | null,
  "choices": ["A) Choice A text", "B) Choice B text", ...] | null
}
Set "question" and "choices" to null when "question_found" is false.
If there is code, include it in the question text.
Only output the JSON object.
If there are multiple questions present, only return the first one."#;

/// Extraction context restated as a system message for the answering
/// model, so the question survives any prompt truncation.
pub fn build_answer_context(question: &str, choices: &[String]) -> String {
    let listed: String = choices.iter().map(|c| format!("- {c}\n")).collect();
    format!("Context from extraction:\nQuestion: {question}\nChoices:\n{listed}")
}

/// User message for the answering model.
pub fn build_answer_prompt(question: &str, choices: &[String]) -> String {
    let listed: String = choices.iter().map(|c| format!("- {c}\n")).collect();
    format!(
        "You are an expert AI assistant. Answer the following multiple-choice question and provide a brief explanation for your choice.\n\
         Limit your total response (answer + explanation) to approximately 700 characters.\n\
         Be concise and clear. State the correct choice first, then the explanation.\n\n\
         Question:\n{question}\n\n\
         Choices:\n{listed}\n\
         Your Answer (Correct Choice + Brief Explanation):"
    )
}
