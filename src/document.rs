//! Typed view of the extracted script.
//!
//! The persisted file is whatever JSON object the model produced (after
//! recovery), not a re-serialisation of these types, so fields the model adds
//! beyond the schema survive. These types exist to summarise and validate a
//! recovered document.

use serde::{Deserialize, Serialize};

/// Root of the output schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDocument {
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

/// One scene of the script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub characters: Vec<Character>,
}

/// A character appearing in a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
}

impl ScriptDocument {
    /// Interpret a recovered JSON value as a script document.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Total character entries across all scenes (a character appearing in
    /// two scenes counts twice).
    pub fn character_count(&self) -> usize {
        self.scenes.iter().map(|s| s.characters.len()).sum()
    }
}
