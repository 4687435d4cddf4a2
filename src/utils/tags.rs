use serde::Deserialize;

/// Skills/interests as sent by clients: either `"Rust, Go"` or `["Rust", "Go"]`
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum TagInput {
    Csv(String),
    List(Vec<String>),
}

impl TagInput {
    /// Trims every entry and drops the empty ones, keeping order
    pub fn into_tags(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            TagInput::Csv(s) => s.split(',').map(str::to_string).collect(),
            TagInput::List(list) => list,
        };

        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

impl Default for TagInput {
    fn default() -> Self {
        TagInput::List(Vec::new())
    }
}
