//! # Online transcript merging
//!
//! Maintains a single, monotonically improving transcript from a stream of
//! partially overlapping recognizer updates. Each update re-decodes a sliding
//! audio window, so successive updates repeat part of what the transcript
//! already holds; the merge reconciles them so that confirmed words
//! stabilize, late corrections win, and nothing duplicates at the overlap.
//!
//! ## Pipeline
//!
//! [`deserialize::words_from_update`] groups raw tokens into [`types::Word`]s
//! (text words, standalone punctuation, segment markers). [`align::lcs_match`]
//! finds the overlap between the transcript's active tail and the update via
//! a gap-bounded longest common subsequence. [`plan::plan_merge`] turns the
//! matched pairs into an ordered operation list, and [`store::Transcript`]
//! executes it, decaying words that repeated updates fail to corroborate.

pub mod align;
pub mod deserialize;
pub mod plan;
pub mod snapshot;
pub mod store;
pub mod types;

pub use deserialize::{DeserializeError, words_from_update};
pub use snapshot::update_from_snapshot;
pub use store::Transcript;
pub use types::{SegmentMeta, SingleToken, Word};
