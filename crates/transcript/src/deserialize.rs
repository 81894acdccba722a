//! Grouping of raw recognizer tokens into [`Word`]s.
//!
//! The recognizer hands over flat token arrays plus segment boundary
//! indices. Grouping applies a strict rule priority per token: segment
//! boundary, control-marker skip, standalone punctuation, byte-fallback
//! join, whitespace word boundary, append.

use chrono::TimeDelta;

use murmur_interface::TokenUpdate;

use crate::types::{SegmentMeta, SingleToken, Word};

/// Recognizer segment timestamps are centiseconds.
const CENTIS_TO_MS: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("parallel token arrays differ in length ({texts} texts, {probs} probs)")]
    TokenArrayMismatch { texts: usize, probs: usize },

    #[error("segment arrays differ in length ({idxs} indices, {starts} starts, {ends} ends)")]
    SegmentArrayMismatch {
        idxs: usize,
        starts: usize,
        ends: usize,
    },

    #[error("segment start index {idx} out of range for {tokens} tokens")]
    SegmentIndexOutOfRange { idx: usize, tokens: usize },

    #[error("segment start indices must be strictly increasing")]
    SegmentIndexOrder,
}

/// Group one update's tokens into an ordered word/segment list.
///
/// An update with no tokens produces no words; that is not an error.
pub fn words_from_update(update: &TokenUpdate) -> Result<Vec<Word>, DeserializeError> {
    validate(update)?;

    let n = update.token_texts.len();
    let seg_idxs = &update.segment_start_token_idxs;

    let mut words: Vec<Word> = Vec::new();
    let mut wip: Vec<SingleToken> = Vec::new();
    let mut seg_ptr = 0usize;

    let mut i = 0usize;
    while i < n {
        if seg_ptr < seg_idxs.len() && i == seg_idxs[seg_ptr] {
            flush(&mut words, &mut wip);
            words.push(Word::segment(segment_meta(update, seg_ptr)));
            seg_ptr += 1;
        }

        let text = update.token_texts[i].as_str();

        if is_marker_token(text) {
            i += 1;
            continue;
        }

        if is_punct_token(text) {
            flush(&mut words, &mut wip);
            words.push(Word::punct(SingleToken::new(
                text,
                update.token_probs[i],
            )));
            i += 1;
            continue;
        }

        if let Some(run) = byte_run_len(&update.token_texts[i..]) {
            wip.push(join_byte_tokens(
                &update.token_texts[i..i + run],
                &update.token_probs[i..i + run],
            ));
            i += run;
            continue;
        }

        if starts_with_whitespace(text) && !wip.is_empty() {
            flush(&mut words, &mut wip);
        }

        wip.push(SingleToken::new(text, update.token_probs[i]));
        i += 1;
    }

    flush(&mut words, &mut wip);
    Ok(words)
}

fn validate(update: &TokenUpdate) -> Result<(), DeserializeError> {
    if update.token_texts.len() != update.token_probs.len() {
        return Err(DeserializeError::TokenArrayMismatch {
            texts: update.token_texts.len(),
            probs: update.token_probs.len(),
        });
    }

    let idxs = update.segment_start_token_idxs.len();
    if idxs != update.start_times.len() || idxs != update.end_times.len() {
        return Err(DeserializeError::SegmentArrayMismatch {
            idxs,
            starts: update.start_times.len(),
            ends: update.end_times.len(),
        });
    }

    for pair in update.segment_start_token_idxs.windows(2) {
        if pair[1] <= pair[0] {
            return Err(DeserializeError::SegmentIndexOrder);
        }
    }

    if let Some(&idx) = update.segment_start_token_idxs.last()
        && idx >= update.token_texts.len()
    {
        return Err(DeserializeError::SegmentIndexOutOfRange {
            idx,
            tokens: update.token_texts.len(),
        });
    }

    Ok(())
}

fn segment_meta(update: &TokenUpdate, seg_ptr: usize) -> SegmentMeta {
    let seg_idxs = &update.segment_start_token_idxs;

    // End token: the one just before the next boundary, or the last overall.
    let end_id = if seg_ptr + 1 == seg_idxs.len() {
        update.token_texts.len() - 1
    } else {
        seg_idxs[seg_ptr + 1] - 1
    };

    let start_ms = update.start_times[seg_ptr] * CENTIS_TO_MS;
    let end_ms = update.end_times[seg_ptr] * CENTIS_TO_MS;

    SegmentMeta {
        end_token: SingleToken::new(
            update.token_texts[end_id].as_str(),
            update.token_probs[end_id],
        ),
        duration_ms: end_ms - start_ms,
        start: update.stamp + TimeDelta::milliseconds(start_ms),
    }
}

fn flush(words: &mut Vec<Word>, wip: &mut Vec<SingleToken>) {
    if !wip.is_empty() {
        words.push(Word::text_word(std::mem::take(wip)));
    }
}

/// Recognizer-internal control tokens, e.g. `[_TT_150_]` or `<|endoftext|>`.
fn is_marker_token(text: &str) -> bool {
    (text.starts_with("[_") && text.ends_with("_]"))
        || (text.starts_with("<|") && text.ends_with("|>"))
}

/// Purely punctuation: non-empty after trimming and no alphanumeric content.
fn is_punct_token(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_whitespace())
}

/// `<0xHH>` byte-fallback token, emitted when the recognizer splits a
/// multi-byte glyph across tokens.
fn byte_token_value(text: &str) -> Option<u8> {
    let hex = text.strip_prefix("<0x")?.strip_suffix('>')?;
    if hex.len() != 2 {
        return None;
    }
    u8::from_str_radix(hex, 16).ok()
}

/// Length of the maximal byte-fallback run starting at `tokens[0]`, if any.
fn byte_run_len(tokens: &[String]) -> Option<usize> {
    let run = tokens
        .iter()
        .take_while(|t| byte_token_value(t).is_some())
        .count();
    (run > 0).then_some(run)
}

/// Combine a byte-fallback run into one token: decode the bytes as UTF-8
/// (lossy on truncated sequences) and average the probabilities.
fn join_byte_tokens(texts: &[String], probs: &[f32]) -> SingleToken {
    let bytes: Vec<u8> = texts.iter().filter_map(|t| byte_token_value(t)).collect();
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let prob = probs.iter().sum::<f32>() / probs.len() as f32;
    SingleToken::new(text, prob)
}
