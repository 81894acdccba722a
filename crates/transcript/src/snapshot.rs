//! Flat serialization of the transcript, and its inverse.
//!
//! Segments are not serialized into the word array; they ride alongside as
//! three parallel arrays keyed by the word index at which each sentence
//! begins. `update_from_snapshot` reconstructs a [`TokenUpdate`] from a
//! snapshot (one token per word), which lets a serialized transcript be fed
//! back through the deserializer — used by the replay example and the
//! round-trip tests.

use chrono::{DateTime, Utc};

use murmur_interface::{TokenUpdate, TranscriptSnapshot};

use crate::types::Word;

const MS_TO_CENTIS: i64 = 10;

pub(crate) fn build(words: &[Word], stale_word_id: usize) -> TranscriptSnapshot {
    let mut snap = TranscriptSnapshot::default();
    let mut segments_before_stale = 0usize;

    for (pos, word) in words.iter().enumerate() {
        if let Some(meta) = word.segment_meta() {
            snap.seg_start_words_id.push(snap.words.len());
            snap.seg_start_time.push(meta.start);
            snap.seg_duration_ms.push(meta.duration_ms);
            if pos < stale_word_id {
                segments_before_stale += 1;
            }
        } else {
            snap.words.push(word.text());
            snap.probs.push(word.prob());
            snap.occ.push(word.occurrences());
        }
    }

    snap.active_index = stale_word_id - segments_before_stale;
    snap
}

/// Rebuild a token update from a snapshot: one token per serialized word,
/// segment boundaries at their word indices, times re-expressed as
/// centisecond offsets from the earliest segment start (or the epoch when
/// the snapshot has no segments).
pub fn update_from_snapshot(snap: &TranscriptSnapshot) -> TokenUpdate {
    let stamp = snap
        .seg_start_time
        .iter()
        .min()
        .copied()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let start_times: Vec<i64> = snap
        .seg_start_time
        .iter()
        .map(|t| (*t - stamp).num_milliseconds() / MS_TO_CENTIS)
        .collect();
    let end_times: Vec<i64> = start_times
        .iter()
        .zip(&snap.seg_duration_ms)
        .map(|(start, duration)| start + duration / MS_TO_CENTIS)
        .collect();

    TokenUpdate {
        stamp,
        token_texts: snap.words.clone(),
        token_probs: snap.probs.clone(),
        segment_start_token_idxs: snap.seg_start_words_id.clone(),
        start_times,
        end_times,
        inference_duration_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserialize::words_from_update;
    use crate::store::Transcript;
    use crate::types::{SegmentMeta, SingleToken};

    fn word(text: &str) -> Word {
        Word::text_word(vec![SingleToken::new(format!(" {text}"), 0.9)])
    }

    fn segment(start: &str, duration_ms: i64) -> Word {
        Word::segment(SegmentMeta {
            end_token: SingleToken::new(".", 1.0),
            duration_ms,
            start: start.parse().unwrap(),
        })
    }

    #[test]
    fn snapshot_excludes_segments_from_word_arrays() {
        let mut t = Transcript::new(4);
        t.merge_update(vec![
            segment("2026-08-02T10:00:00Z", 1000),
            word("hello"),
            word("world"),
            segment("2026-08-02T10:00:01Z", 800),
            word("again"),
        ]);

        let snap = t.snapshot();
        assert_eq!(snap.words, [" hello", " world", " again"]);
        assert_eq!(snap.occ, [1, 1, 1]);
        assert_eq!(snap.seg_start_words_id, [0, 2]);
        assert_eq!(snap.seg_duration_ms, [1000, 800]);
        assert_eq!(snap.active_index, 0);
    }

    #[test]
    fn active_index_discounts_segments_before_the_cursor() {
        let mut t = Transcript::new(4);
        t.merge_update(vec![
            segment("2026-08-02T10:00:00Z", 1000),
            word("a"),
            word("b"),
            word("c"),
        ]);
        // The matched region starts two comparable words into the tail, so
        // the cursor advances past the segment and the first word.
        t.merge_update(vec![word("c"), word("d")]);

        assert_eq!(t.stale_word_id(), 2);
        let snap = t.snapshot();
        assert_eq!(snap.active_index, 1);
        assert!(snap.active_index <= snap.words.len());
    }

    #[test]
    fn segment_order_mirrors_transcript_order() {
        let mut t = Transcript::new(4);
        t.merge_update(vec![
            segment("2026-08-02T10:00:00Z", 500),
            word("one"),
            segment("2026-08-02T10:00:02Z", 700),
            word("two"),
        ]);

        let snap = t.snapshot();
        assert_eq!(snap.seg_start_words_id, [0, 1]);
        assert!(snap.seg_start_time[0] < snap.seg_start_time[1]);
    }

    #[test]
    fn reingesting_a_snapshot_reproduces_it() {
        let source = TokenUpdate {
            stamp: "2026-08-02T10:00:00Z".parse().unwrap(),
            token_texts: vec![
                " hello".into(),
                " world".into(),
                ",".into(),
                " again".into(),
            ],
            token_probs: vec![0.9, 0.8, 0.7, 0.6],
            segment_start_token_idxs: vec![0, 3],
            start_times: vec![0, 150],
            end_times: vec![150, 220],
            inference_duration_ms: 0,
        };

        let mut first = Transcript::new(4);
        first.merge_update(words_from_update(&source).unwrap());
        let snap = first.snapshot();

        let mut second = Transcript::new(4);
        second.merge_update(words_from_update(&update_from_snapshot(&snap)).unwrap());
        let back = second.snapshot();

        assert_eq!(back, snap);
    }

    #[test]
    fn snapshot_of_empty_transcript_is_empty() {
        let t = Transcript::new(4);
        let snap = t.snapshot();
        assert!(snap.words.is_empty());
        assert!(snap.seg_start_words_id.is_empty());
        assert_eq!(snap.active_index, 0);
    }
}
