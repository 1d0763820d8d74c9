use serde::{Deserialize, Serialize};

/// One concept with the prompt pair fed to the inpainting collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConceptPrompt {
    pub concept: String,
    pub positive: String,
    pub negative: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanError {
    pub start: usize,
    pub end: usize,
    pub message: String,
}

impl std::fmt::Display for SpanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed parsing span {}..{}: {}",
            self.start, self.end, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSpan {
    pub start: usize,
    pub end: usize,
    pub outcome: Result<Vec<ConceptPrompt>, SpanError>,
}

/// Result of scanning model output. `NotFound` is never folded into an
/// empty `Found`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    NotFound,
    Found(Vec<ExtractedSpan>),
}

impl Extraction {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Extraction::NotFound)
    }

    pub fn spans(&self) -> &[ExtractedSpan] {
        match self {
            Extraction::NotFound => &[],
            Extraction::Found(spans) => spans,
        }
    }

    /// Records of every span that parsed, in text order.
    pub fn records(&self) -> Vec<ConceptPrompt> {
        self.spans()
            .iter()
            .filter_map(|span| span.outcome.as_ref().ok())
            .flat_map(|records| records.iter().cloned())
            .collect()
    }

    pub fn first_list(&self) -> Option<&[ConceptPrompt]> {
        self.spans()
            .iter()
            .find_map(|span| span.outcome.as_ref().ok())
            .map(Vec::as_slice)
    }

    pub fn errors(&self) -> Vec<&SpanError> {
        self.spans()
            .iter()
            .filter_map(|span| span.outcome.as_ref().err())
            .collect()
    }
}

/// Byte ranges of every `[ {...}, ... ]` candidate, in text order.
///
/// A candidate opens at `[` followed by optional whitespace and `{`, and
/// closes at its balanced `]`. An unbalanced candidate still yields a span,
/// ending at the first `}` followed by `]`, or just before the next balanced
/// candidate when one starts earlier; it fails later at parse time. A
/// candidate with no `}`/`]` pair after it at all is skipped.
pub fn find_record_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut idx = 0;
    while idx < bytes.len() {
        if is_candidate(bytes, idx) {
            if let Some(close) = balanced_close(bytes, idx) {
                spans.push((idx, close + 1));
                idx = close + 1;
                continue;
            }
            if let Some(close) = loose_close(bytes, idx) {
                let end = match next_balanced_candidate(bytes, idx + 1, close) {
                    Some(next) => trim_end(bytes, idx, next),
                    None => close + 1,
                };
                spans.push((idx, end));
                idx = end;
                continue;
            }
        }
        idx += 1;
    }
    spans
}

fn is_candidate(bytes: &[u8], idx: usize) -> bool {
    bytes[idx] == b'[' && opens_record_list(bytes, idx)
}

/// First `}` followed by optional whitespace and `]`, ignoring quotes.
fn loose_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut idx = open + 1;
    while idx < bytes.len() {
        if bytes[idx] == b'}' {
            let close = bytes[idx + 1..]
                .iter()
                .position(|byte| !byte.is_ascii_whitespace())
                .map(|offset| idx + 1 + offset)
                .filter(|pos| bytes[*pos] == b']');
            if close.is_some() {
                return close;
            }
        }
        idx += 1;
    }
    None
}

fn next_balanced_candidate(bytes: &[u8], from: usize, until: usize) -> Option<usize> {
    (from..until).find(|idx| is_candidate(bytes, *idx) && balanced_close(bytes, *idx).is_some())
}

fn trim_end(bytes: &[u8], start: usize, mut end: usize) -> usize {
    while end > start + 1 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    end
}

fn opens_record_list(bytes: &[u8], open: usize) -> bool {
    bytes[open + 1..]
        .iter()
        .find(|byte| !byte.is_ascii_whitespace())
        .is_some_and(|byte| *byte == b'{')
}

fn balanced_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut expected: Vec<u8> = Vec::new();
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (offset, byte) in bytes[open..].iter().enumerate() {
        if let Some(active) = quote {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == active {
                quote = None;
            }
            continue;
        }
        match byte {
            b'"' | b'\'' => quote = Some(*byte),
            b'[' => expected.push(b']'),
            b'{' => expected.push(b'}'),
            b']' | b'}' => {
                if expected.pop() != Some(*byte) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict parse of one span; malformed records are rejected, not coerced.
pub fn parse_span(span: &str) -> Result<Vec<ConceptPrompt>, String> {
    serde_json::from_str::<Vec<ConceptPrompt>>(span).map_err(|err| err.to_string())
}

pub fn extract_concept_prompts(text: &str) -> Extraction {
    let spans = find_record_spans(text);
    if spans.is_empty() {
        return Extraction::NotFound;
    }
    Extraction::Found(
        spans
            .into_iter()
            .map(|(start, end)| ExtractedSpan {
                start,
                end,
                outcome: parse_span(&text[start..end]).map_err(|message| SpanError {
                    start,
                    end,
                    message,
                }),
            })
            .collect(),
    )
}
