use chrono::{DateTime, Utc};

/// Flat serialization of the current transcript.
///
/// `words`, `probs` and `occ` are parallel and exclude segment markers.
/// Segments are carried on the side: for each segment in transcript order,
/// `seg_start_words_id` holds the index into `words` at which the sentence
/// begins, with start time and duration in the two parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptSnapshot {
    pub words: Vec<String>,
    pub probs: Vec<f32>,
    pub occ: Vec<u32>,
    pub seg_start_words_id: Vec<usize>,
    pub seg_start_time: Vec<DateTime<Utc>>,
    pub seg_duration_ms: Vec<i64>,
    /// Index into `words` separating finalized output from the active tail.
    pub active_index: usize,
}

/// Why a feedback session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishCause {
    Succeeded,
    Cancelled,
    TimedOut,
}

/// Server-to-client frames on the listen socket.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
#[non_exhaustive]
pub enum StreamResponse {
    /// Full transcript snapshot, sent after every drain that merged data.
    #[serde(rename = "Transcript")]
    TranscriptResponse { transcript: TranscriptSnapshot },
    /// Periodic feedback for an active listen session: the running
    /// concatenation of all non-segment words received since the session
    /// began, plus a drain counter.
    #[serde(rename = "Feedback")]
    FeedbackResponse {
        transcription: String,
        batch_idx: u32,
    },
    /// Terminal frame of a listen session.
    #[serde(rename = "Result")]
    ResultResponse {
        transcriptions: Vec<String>,
        info: String,
        cause: FinishCause,
    },
    #[serde(rename = "Error")]
    ErrorResponse { error_message: String },
}
