use chrono::{DateTime, Utc};

/// One recognizer token with its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleToken {
    pub text: String,
    pub prob: f32,
}

impl SingleToken {
    pub fn new(text: impl Into<String>, prob: f32) -> Self {
        Self {
            text: text.into(),
            prob,
        }
    }
}

/// Sentence-boundary metadata. A segment marks where a sentence begins and
/// carries its timing; the words themselves follow it in the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMeta {
    /// The token that closed the segment in the update it came from.
    pub end_token: SingleToken,
    pub duration_ms: i64,
    pub start: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
enum WordKind {
    Text {
        tokens: Vec<SingleToken>,
        is_punct: bool,
    },
    Segment(SegmentMeta),
}

/// One element of the transcript: a lexical word, a standalone punctuation
/// mark, or a segment marker.
///
/// Every word carries an occurrence count (how many updates corroborated it;
/// zero means garbage) and a smoothed probability. The `comparable` form is
/// what the aligner matches on — punctuation and segments yield an empty
/// comparable and sit out of alignment entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    kind: WordKind,
    occurrences: u32,
    prob: f32,
}

impl Word {
    pub fn text_word(tokens: Vec<SingleToken>) -> Self {
        debug_assert!(!tokens.is_empty(), "text words need at least one token");
        let prob = mean_prob(&tokens);
        Self {
            kind: WordKind::Text {
                tokens,
                is_punct: false,
            },
            occurrences: 1,
            prob,
        }
    }

    pub fn punct(token: SingleToken) -> Self {
        let prob = token.prob;
        Self {
            kind: WordKind::Text {
                tokens: vec![token],
                is_punct: true,
            },
            occurrences: 1,
            prob,
        }
    }

    pub fn segment(meta: SegmentMeta) -> Self {
        let prob = meta.end_token.prob;
        Self {
            kind: WordKind::Segment(meta),
            occurrences: 1,
            prob,
        }
    }

    pub fn is_segment(&self) -> bool {
        matches!(self.kind, WordKind::Segment(_))
    }

    pub fn is_punct(&self) -> bool {
        matches!(
            self.kind,
            WordKind::Text { is_punct: true, .. }
        )
    }

    pub fn segment_meta(&self) -> Option<&SegmentMeta> {
        match &self.kind {
            WordKind::Segment(meta) => Some(meta),
            WordKind::Text { .. } => None,
        }
    }

    /// Concatenated token text, with whatever spacing the recognizer emitted.
    /// Empty for segments.
    pub fn text(&self) -> String {
        match &self.kind {
            WordKind::Text { tokens, .. } => tokens.iter().map(|t| t.text.as_str()).collect(),
            WordKind::Segment(_) => String::new(),
        }
    }

    /// Normalized form used for alignment equality. Empty means this word
    /// does not participate in alignment (punctuation, segments).
    pub fn comparable(&self) -> String {
        match &self.kind {
            WordKind::Text { is_punct: true, .. } | WordKind::Segment(_) => String::new(),
            WordKind::Text { tokens, .. } => {
                let text: String = tokens.iter().map(|t| t.text.as_str()).collect();
                text.trim().to_lowercase()
            }
        }
    }

    pub fn occurrences(&self) -> u32 {
        self.occurrences
    }

    pub fn prob(&self) -> f32 {
        self.prob
    }

    /// A matching update re-confirmed this word: bump occurrences and fold
    /// the new probability into the running average.
    pub(crate) fn record_match(&mut self, other: &Word) {
        self.prob = (self.prob * self.occurrences as f32 + other.prob)
            / (self.occurrences as f32 + 1.0);
        self.occurrences += 1;
    }

    pub(crate) fn decrement(&mut self) {
        self.occurrences = self.occurrences.saturating_sub(1);
    }

    /// Conflict resolution: the new word's text and probability replace this
    /// word's, and the confirmation count starts over.
    pub(crate) fn overwrite_with(&mut self, other: &Word) {
        self.kind = other.kind.clone();
        self.prob = other.prob;
        self.occurrences = 1;
    }

    /// Reconcile two segment markers describing the same boundary: keep the
    /// earlier start and the longer duration.
    pub(crate) fn merge_segment(&mut self, other: &SegmentMeta) {
        if let WordKind::Segment(meta) = &mut self.kind {
            meta.start = meta.start.min(other.start);
            meta.duration_ms = meta.duration_ms.max(other.duration_ms);
        }
    }
}

fn mean_prob(tokens: &[SingleToken]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    tokens.iter().map(|t| t.prob).sum::<f32>() / tokens.len() as f32
}
