pub mod stream;
pub mod update;

pub use stream::{FinishCause, StreamResponse, TranscriptSnapshot};
pub use update::TokenUpdate;

fn default_allowed_gaps() -> u32 {
    4
}
fn default_ring_capacity() -> usize {
    10
}
fn default_drain_interval_ms() -> u64 {
    1000
}
fn default_poll_interval_ms() -> u64 {
    15
}

/// Per-session knobs, parsed from the listen endpoint's query string.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ListenParams {
    /// Gap budget of the aligner. Higher tolerates more single-word
    /// recognition errors inside the overlap; lower avoids false matches
    /// across sentence boundaries.
    #[serde(default = "default_allowed_gaps")]
    pub allowed_gaps: u32,
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ListenParams {
    fn default() -> Self {
        Self {
            allowed_gaps: default_allowed_gaps(),
            ring_capacity: default_ring_capacity(),
            drain_interval_ms: default_drain_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Control frames a client may send alongside token updates.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Start a feedback session that streams running transcriptions back
    /// until cancelled or `max_duration_ms` elapses.
    Listen { max_duration_ms: u64 },
    CancelListen,
    KeepAlive,
    CloseStream,
}
