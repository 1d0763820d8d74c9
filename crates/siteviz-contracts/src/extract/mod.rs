mod concept_parser;

pub use concept_parser::{
    extract_concept_prompts, find_record_spans, parse_span, ConceptPrompt, ExtractedSpan,
    Extraction, SpanError,
};
