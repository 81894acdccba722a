//! Replay a scripted sequence of overlapping recognizer updates and print
//! the transcript after each merge.
//!
//! ```sh
//! cargo run -p murmur-transcript --example replay
//! ```

use chrono::{TimeDelta, Utc};

use murmur_interface::TokenUpdate;
use murmur_transcript::{Transcript, words_from_update};

fn update(offset_ms: i64, tokens: &[(&str, f32)], segments: &[(usize, i64, i64)]) -> TokenUpdate {
    TokenUpdate {
        stamp: Utc::now() + TimeDelta::milliseconds(offset_ms),
        token_texts: tokens.iter().map(|&(t, _)| t.to_string()).collect(),
        token_probs: tokens.iter().map(|&(_, p)| p).collect(),
        segment_start_token_idxs: segments.iter().map(|&(i, _, _)| i).collect(),
        start_times: segments.iter().map(|&(_, s, _)| s).collect(),
        end_times: segments.iter().map(|&(_, _, e)| e).collect(),
        inference_duration_ms: 0,
    }
}

fn main() {
    let updates = vec![
        update(
            0,
            &[(" the", 0.9), (" quick", 0.5), (" brown", 0.8)],
            &[(0, 0, 120)],
        ),
        update(
            500,
            &[(" the", 0.9), (" quick", 0.9), (" brown", 0.9), (" fox", 0.8)],
            &[(0, 0, 180)],
        ),
        update(
            1000,
            &[(" brown", 0.9), (" fox", 0.9), (" jumps", 0.7), (".", 0.9)],
            &[(0, 100, 260)],
        ),
        update(
            1500,
            &[(" jumps", 0.9), (" over", 0.8), (" the", 0.8), (" dog", 0.6)],
            &[(0, 200, 340)],
        ),
    ];

    let mut transcript = Transcript::new(4);

    for (idx, u) in updates.iter().enumerate() {
        let words = match words_from_update(u) {
            Ok(words) => words,
            Err(e) => {
                eprintln!("update {idx} skipped: {e}");
                continue;
            }
        };
        transcript.merge_update(words);

        let snap = transcript.snapshot();
        println!(
            "after update {idx}:{}\n  segments={} active_index={} occ={:?}",
            transcript.text(),
            snap.seg_start_words_id.len(),
            snap.active_index,
            snap.occ,
        );
    }
}
