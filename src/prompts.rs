//! Prompts sent to the model backend.
//!
//! Every instruction the model sees lives here so prompt changes touch one
//! file and unit tests can inspect the exact text without a live model.
//! Callers can replace the system instruction via
//! [`crate::config::ExtractionConfig::system_prompt`]; the user prompt is
//! always built by [`build_prompt`].

/// Default system instruction for script extraction.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert at reading movie scripts and organizing them into a structured JSON format. \
Extract character names, dialogue, and scene descriptions efficiently, and omit unnecessary information.";

/// Instruction preceding the schema example.
const EXTRACTION_INSTRUCTIONS: &str = "Extract and structure the key information in JSON format. \
Ensure that all characters mentioned in the scene are included in the 'characters' field, \
along with both their actions and dialogues. \
Keep scene descriptions concise, focusing only on the most important actions and settings. \
If a scene or any other description is not included in the text, omit the related field. \
Never emit null or empty placeholder values for omitted fields.";

/// Illustrative example of the target `ScriptDocument` shape.
pub const SCHEMA_EXAMPLE: &str = r#"{
    "scenes": [
        {
            "location": "Scene location",
            "time": "Scene time",
            "characters": [
                {
                    "name": "Character Name",
                    "actions": [
                        "Action 1",
                        "Action 2"
                    ],
                    "dialogue": "Character's dialogue here"
                },
                {
                    "name": "Another Character",
                    "actions": [
                        "Action 1",
                        "Action 2"
                    ],
                    "dialogue": "Their dialogue here"
                }
            ]
        }
    ]
}"#;

/// Embed OCR output into the fixed extraction template.
///
/// Always succeeds; the text is inserted verbatim after the schema example.
pub fn build_prompt(extracted_text: &str) -> String {
    format!(
        "{EXTRACTION_INSTRUCTIONS}\n\nExample output format:\n\n{SCHEMA_EXAMPLE}\n\nText: {extracted_text}\n"
    )
}
