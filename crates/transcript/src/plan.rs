//! Merge planning: turning an alignment into an ordered operation list.
//!
//! The aligner works in comparable space (punctuation and segments removed);
//! the planner translates its index pairs back to full-array positions and
//! walks the unmatched gaps between consecutive anchors, emitting one
//! operation per step according to a fixed rule priority.

use crate::align::lcs_match;
use crate::types::Word;

/// One transcript mutation, in old-array / new-array index space.
///
/// `old` indices are relative to the active tail the plan was built from;
/// the executor adds the stale offset and tracks insertion shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Confirmed alignment: bump occurrences, blend probability.
    Match { old: usize, new: usize },
    /// Both sides are segment markers at this position: reconcile timing.
    MergeSegments { old: usize, new: usize },
    /// Splice the new word in before old position `old`.
    Insert { old: usize, new: usize },
    /// The new word overwrites the old one; occurrences start over.
    Conflict { old: usize, new: usize },
    /// The update did not corroborate this word.
    Decrement { old: usize },
}

#[derive(Debug)]
pub struct MergePlan {
    pub ops: Vec<Op>,
    /// First matched pair in comparable space; drives the stale-cursor
    /// advance after execution.
    pub first_match: (usize, usize),
}

/// Plan the merge of `new_words` into the active tail `old_words`.
///
/// Returns `None` when the aligner finds no overlap at all — the caller
/// treats the update as a pure append.
///
/// The prefix before the first matched pair is deliberately left
/// unreconciled; only inter-match gaps and the suffix are walked. This is a
/// latency optimization carried over from the rule set's origin: leading
/// context has usually already stabilized, and touching it would re-open
/// finalized output.
pub fn plan_merge(old_words: &[Word], new_words: &[Word], allowed_gaps: u32) -> Option<MergePlan> {
    let (comp_old, offsets_old) = comparable_with_offsets(old_words);
    let (comp_new, offsets_new) = comparable_with_offsets(new_words);

    let (ai, bi) = lcs_match(&comp_old, &comp_new, allowed_gaps);
    if ai.is_empty() {
        return None;
    }

    let mut ops = Vec::new();

    let (mut prev_a, mut prev_b) = (ai[0], bi[0]);
    for k in 1..=ai.len() {
        // Translate the anchor into full-array space by re-adding the
        // words skipped before it.
        let pa = prev_a + offsets_old[prev_a];
        let pb = prev_b + offsets_new[prev_b];
        ops.push(Op::Match { old: pa, new: pb });

        let (mut cur_a, mut cur_b) = (pa + 1, pb + 1);
        let (next_a, next_b) = if k == ai.len() {
            // Past the last anchor the walk runs to the end of both arrays;
            // most commonly this appends trailing new words.
            (old_words.len(), new_words.len())
        } else {
            (ai[k] + offsets_old[ai[k]], bi[k] + offsets_new[bi[k]])
        };

        while cur_a != next_a || cur_b != next_b {
            let old_active = cur_a != next_a;
            let new_active = cur_b != next_b;

            if old_active && new_active && old_words[cur_a].is_segment()
                && new_words[cur_b].is_segment()
            {
                ops.push(Op::MergeSegments {
                    old: cur_a,
                    new: cur_b,
                });
                cur_a += 1;
                cur_b += 1;
            } else if old_active && old_words[cur_a].is_segment() {
                // Structural markers decay twice as fast as words.
                ops.push(Op::Decrement { old: cur_a });
                ops.push(Op::Decrement { old: cur_a });
                cur_a += 1;
            } else if new_active && new_words[cur_b].is_segment() {
                ops.push(Op::Insert {
                    old: cur_a,
                    new: cur_b,
                });
                cur_b += 1;
            } else if old_active && new_active && old_words[cur_a].is_punct()
                && !new_words[cur_b].is_punct()
            {
                // Prefer letting a real word overwrite a stray punctuation.
                ops.push(Op::Decrement { old: cur_a });
                ops.push(Op::Conflict {
                    old: cur_a,
                    new: cur_b,
                });
                cur_a += 1;
                cur_b += 1;
            } else if old_active && new_active {
                ops.push(Op::Conflict {
                    old: cur_a,
                    new: cur_b,
                });
                cur_a += 1;
                cur_b += 1;
            } else if new_active {
                ops.push(Op::Insert {
                    old: cur_a,
                    new: cur_b,
                });
                cur_b += 1;
            } else {
                ops.push(Op::Decrement { old: cur_a });
                cur_a += 1;
            }
        }

        if k < ai.len() {
            (prev_a, prev_b) = (ai[k], bi[k]);
        }
    }

    Some(MergePlan {
        ops,
        first_match: (ai[0], bi[0]),
    })
}

/// Comparable strings plus, per comparable word, how many empty-comparable
/// words precede it in the full array (the comparable→full translation).
fn comparable_with_offsets(words: &[Word]) -> (Vec<String>, Vec<usize>) {
    let mut comp = Vec::with_capacity(words.len());
    let mut offsets = Vec::with_capacity(words.len());
    let mut skipped = 0usize;

    for word in words {
        let c = word.comparable();
        if c.is_empty() {
            skipped += 1;
        } else {
            comp.push(c);
            offsets.push(skipped);
        }
    }

    (comp, offsets)
}
