use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PRESET_ID: &str = "general";
pub const DEFAULT_ALLOWED_TOOLS: &[&str] = &["Read", "Write", "Bash", "Grep", "Glob"];

/// A named system-prompt preset: display name, prompt text, and the tool
/// allow-list forwarded to the upstream runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptPreset {
    pub name: String,
    pub prompt: String,
    #[serde(default = "default_allowed_tools")]
    pub allowed_tools: Vec<String>,
}

fn default_allowed_tools() -> Vec<String> {
    DEFAULT_ALLOWED_TOOLS.iter().map(|s| s.to_string()).collect()
}

impl PromptPreset {
    fn builtin(name: &str, prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.to_string(),
            allowed_tools: default_allowed_tools(),
        }
    }
}

/// Built-in presets, keyed by preset identifier. Config-file presets extend
/// and may override these.
pub fn builtin_presets() -> BTreeMap<String, PromptPreset> {
    let mut presets = BTreeMap::new();
    presets.insert(
        "general".to_string(),
        PromptPreset::builtin(
            "General assistant",
            "You are a capable, friendly assistant.\n\
             Provide accurate information and say so when you are unsure.\n\
             Keep answers concise and practical, and prefer actionable advice.",
        ),
    );
    presets.insert(
        "data_analyst".to_string(),
        PromptPreset::builtin(
            "Data analyst",
            "You are a data analysis specialist.\n\
             Clean, transform, and aggregate data before drawing conclusions.\n\
             Base every claim on evidence from the data, state the analysis method used,\n\
             and finish with concrete, actionable recommendations.",
        ),
    );
    presets.insert(
        "content_writer".to_string(),
        PromptPreset::builtin(
            "Content writer",
            "You are an experienced writing and editing assistant.\n\
             Adapt tone and structure to the target audience, keep the logical flow clear,\n\
             and polish wording for readability. Ask for the content type, topic, and style\n\
             if they are missing.",
        ),
    );
    presets.insert(
        "researcher".to_string(),
        PromptPreset::builtin(
            "Research analyst",
            "You are a rigorous research analyst.\n\
             Define the question, gather information from multiple angles, assess source\n\
             reliability, and present findings as: summary, detailed analysis, supporting\n\
             data, and recommendations. Stay objective and flag uncertainty explicitly.",
        ),
    );
    presets
}

/// Look up `preset_id`, preferring `custom` entries over built-ins.
pub fn resolve_preset(
    preset_id: &str,
    custom: &BTreeMap<String, PromptPreset>,
) -> Option<PromptPreset> {
    custom
        .get(preset_id)
        .cloned()
        .or_else(|| builtin_presets().get(preset_id).cloned())
}
