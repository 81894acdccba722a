use chrono::{DateTime, Utc};

/// One recognizer output covering a sliding audio window.
///
/// `token_texts` and `token_probs` are parallel. Segments are described by
/// three parallel arrays: a start index into `token_texts` plus start/end
/// offsets in centiseconds from `stamp` (the recognizer's native timestamp
/// unit).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TokenUpdate {
    /// Absolute base timestamp of the audio window.
    pub stamp: DateTime<Utc>,
    pub token_texts: Vec<String>,
    pub token_probs: Vec<f32>,
    #[serde(default)]
    pub segment_start_token_idxs: Vec<usize>,
    #[serde(default)]
    pub start_times: Vec<i64>,
    #[serde(default)]
    pub end_times: Vec<i64>,
    /// How long the recognizer spent on this window. Informational only.
    #[serde(default)]
    pub inference_duration_ms: u64,
}
