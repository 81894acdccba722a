//! The transcript store and operation executor.
//!
//! The store owns every [`Word`] exclusively; segments reference their
//! sentence only by position. Words below the stale cursor are finalized
//! and never re-aligned; the suffix from the cursor onward is the active
//! tail each new update merges into.

use murmur_interface::TranscriptSnapshot;

use crate::plan::{Op, plan_merge};
use crate::snapshot;
use crate::types::Word;

#[derive(Debug)]
pub struct Transcript {
    words: Vec<Word>,
    stale_word_id: usize,
    allowed_gaps: u32,
}

impl Transcript {
    pub fn new(allowed_gaps: u32) -> Self {
        Self {
            words: Vec::new(),
            stale_word_id: 0,
            allowed_gaps,
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Positions below this index are finalized and no longer re-aligned.
    pub fn stale_word_id(&self) -> usize {
        self.stale_word_id
    }

    /// Concatenated text of all non-segment words, with recognizer spacing.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .filter(|w| !w.is_segment())
            .map(|w| w.text())
            .collect()
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        snapshot::build(&self.words, self.stale_word_id)
    }

    /// Merge one deserialized update into the transcript.
    ///
    /// An empty transcript adopts the update wholesale; an update with no
    /// alignment overlap against the active tail is appended. Otherwise the
    /// planned operations run, zero-occurrence words in the tail are pruned,
    /// and the stale cursor advances by however far the matched region's
    /// old-side start outpaced its new-side start.
    pub fn merge_update(&mut self, new_words: Vec<Word>) {
        if new_words.is_empty() {
            return;
        }

        if self.words.is_empty() {
            tracing::debug!(words = new_words.len(), "transcript_seeded");
            self.words = new_words;
            return;
        }

        let tail = &self.words[self.stale_word_id..];
        let Some(plan) = plan_merge(tail, &new_words, self.allowed_gaps) else {
            tracing::debug!(appended = new_words.len(), "no_overlap_appending");
            self.words.extend(new_words);
            return;
        };

        let (first_a, first_b) = plan.first_match;
        self.apply(&plan.ops, &new_words);
        self.clear_mistakes();

        let advanced = self.stale_word_id as i64 + first_a as i64 - first_b as i64;
        let stale = advanced.clamp(self.stale_word_id as i64, self.words.len() as i64) as usize;
        if stale != self.stale_word_id {
            tracing::debug!(from = self.stale_word_id, to = stale, "stale_cursor_advanced");
        }
        self.stale_word_id = stale;
    }

    /// Execute a planned operation batch.
    ///
    /// Op indices are relative to the active tail; inserts shift every
    /// later index, which the running offset accounts for (old indices in a
    /// plan are non-decreasing).
    fn apply(&mut self, ops: &[Op], new_words: &[Word]) {
        let base = self.stale_word_id;
        let mut shift = 0usize;

        for &op in ops {
            match op {
                Op::Match { old, new } => {
                    self.words[base + old + shift].record_match(&new_words[new]);
                }
                Op::MergeSegments { old, new } => {
                    if let Some(meta) = new_words[new].segment_meta() {
                        self.words[base + old + shift].merge_segment(meta);
                    }
                }
                Op::Insert { old, new } => {
                    self.words
                        .insert(base + old + shift, new_words[new].clone());
                    shift += 1;
                }
                Op::Conflict { old, new } => {
                    self.words[base + old + shift].overwrite_with(&new_words[new]);
                }
                Op::Decrement { old } => {
                    self.words[base + old + shift].decrement();
                }
            }
        }
    }

    /// Drop active-tail words whose occurrences decayed to zero.
    fn clear_mistakes(&mut self) {
        let stale = self.stale_word_id;
        let mut idx = 0usize;
        self.words.retain(|w| {
            let keep = idx < stale || w.occurrences() > 0;
            idx += 1;
            keep
        });
    }
}
