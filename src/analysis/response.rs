//! Tolerant decoding of evaluator answers
//!
//! Models are asked for strict JSON, but answers arrive fenced in markdown,
//! wrapped in prose, with single quotes, or with loosely spelled statuses.
//! Everything recoverable is recovered; the rest becomes a [`ParseError`].

use super::error::ParseError;
use super::types::{PracticeVerdicts, VerdictRecord, VerdictStatus};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// How positional records are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// `[status, code_snippet, suggestion]`
    StatusCodeSuggestion,
    /// `[status, suggestion]`, used for repository-level answers
    StatusSuggestion,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRecord {
    Positional(Vec<Option<String>>),
    Structured {
        status: String,
        #[serde(default, alias = "code")]
        code_snippet: Option<String>,
        #[serde(default)]
        suggestion: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRecordList {
    Many(Vec<RawRecord>),
    Single(RawRecord),
}

impl RawRecord {
    fn into_record(self, layout: RecordLayout) -> Option<VerdictRecord> {
        match self {
            RawRecord::Positional(fields) => {
                let mut fields = fields.into_iter();
                let status = VerdictStatus::parse_lenient(&fields.next()??);
                let (code_snippet, suggestion) = match layout {
                    RecordLayout::StatusCodeSuggestion => {
                        (fields.next().flatten(), fields.next().flatten())
                    }
                    RecordLayout::StatusSuggestion => (None, fields.next().flatten()),
                };
                Some(VerdictRecord {
                    status,
                    code_snippet: non_empty(code_snippet),
                    suggestion: non_empty(suggestion),
                })
            }
            RawRecord::Structured {
                status,
                code_snippet,
                suggestion,
            } => Some(VerdictRecord {
                status: VerdictStatus::parse_lenient(&status),
                code_snippet: non_empty(code_snippet),
                suggestion: non_empty(suggestion),
            }),
        }
    }
}

impl RawRecordList {
    fn into_records(self, layout: RecordLayout) -> Vec<VerdictRecord> {
        match self {
            RawRecordList::Many(records) => records
                .into_iter()
                .filter_map(|r| r.into_record(layout))
                .collect(),
            RawRecordList::Single(record) => record.into_record(layout).into_iter().collect(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Decodes a batch answer: a JSON object mapping practice id to records.
///
/// Ids that were not part of the batch are dropped, as are entries whose
/// value cannot be read as records.
pub fn decode_batch_response(
    response: &str,
    batch_ids: &[&str],
    layout: RecordLayout,
) -> Result<PracticeVerdicts, ParseError> {
    let json = extract_delimited(response, '{', '}')
        .ok_or(ParseError::MissingPayload { expected: "object" })?;
    let entries: BTreeMap<String, Value> = parse_lenient_json(&json)?;

    let wanted: HashSet<&str> = batch_ids.iter().copied().collect();
    let mut verdicts = PracticeVerdicts::new();

    for (raw_id, value) in entries {
        let id = raw_id.trim();
        if !wanted.contains(id) {
            debug!("Dropping verdicts for practice '{}' outside the batch", id);
            continue;
        }

        match serde_json::from_value::<RawRecordList>(value) {
            Ok(list) => {
                verdicts
                    .entry(id.to_string())
                    .or_default()
                    .extend(list.into_records(layout));
            }
            Err(e) => warn!("Unreadable verdicts for practice '{}': {}", id, e),
        }
    }

    Ok(verdicts)
}

/// Decodes a single-practice answer.
///
/// An empty answer or empty list yields no records. A list of strings is one
/// record; a list of lists or objects is one record each.
pub fn decode_window_response(response: &str) -> Result<Vec<VerdictRecord>, ParseError> {
    if response.trim().is_empty() {
        return Ok(Vec::new());
    }

    let json = extract_delimited(response, '[', ']')
        .ok_or(ParseError::MissingPayload { expected: "array" })?;
    let list: RawRecordList = parse_lenient_json(&json)?;

    Ok(list.into_records(RecordLayout::StatusCodeSuggestion))
}

fn parse_lenient_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, ParseError> {
    match serde_json::from_str(json) {
        Ok(value) => Ok(value),
        Err(first) if !json.contains('"') && json.contains('\'') => {
            serde_json::from_str(&json.replace('\'', "\"")).map_err(|_| {
                ParseError::InvalidJson(format!("{}: {}", first, preview(json)))
            })
        }
        Err(e) => Err(ParseError::InvalidJson(format!("{}: {}", e, preview(json)))),
    }
}

fn preview(json: &str) -> String {
    json.chars().take(100).collect()
}

fn fenced_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```(?:json|python)?\s*\n?([\s\S]*?)\n?```").expect("fence regex is valid")
    })
}

/// Finds the outermost `open ... close` span, preferring a fenced block
fn extract_delimited(response: &str, open: char, close: char) -> Option<String> {
    let trimmed = response.trim();

    let body = fenced_block()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|inner| inner.contains(open))
        .unwrap_or(trimmed);

    let start = body.find(open)?;
    let end = body.rfind(close)?;
    (start < end).then(|| body[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: [&str; 2] = ["ctx", "naming"];

    #[test]
    fn test_decode_positional_records() {
        let response = r#"{"ctx": [["Violated", "f = open(p)", "Use a with-block"]], "naming": [["Not Violated"]]}"#;
        let verdicts =
            decode_batch_response(response, &BATCH, RecordLayout::StatusCodeSuggestion).unwrap();

        assert_eq!(
            verdicts["ctx"],
            vec![VerdictRecord::violated("f = open(p)", "Use a with-block")]
        );
        assert_eq!(
            verdicts["naming"],
            vec![VerdictRecord::new(VerdictStatus::NotViolated)]
        );
    }

    #[test]
    fn test_decode_structured_records_in_markdown() {
        let response = "Here you go:\n```json\n{\"ctx\": [{\"status\": \"not_relevant\"}, {\"status\": \"VIOLATED\", \"code\": \"x\", \"suggestion\": \"y\"}]}\n```";
        let verdicts =
            decode_batch_response(response, &BATCH, RecordLayout::StatusCodeSuggestion).unwrap();

        assert_eq!(verdicts["ctx"].len(), 2);
        assert_eq!(verdicts["ctx"][0].status, VerdictStatus::NotRelevant);
        assert_eq!(verdicts["ctx"][1], VerdictRecord::violated("x", "y"));
    }

    #[test]
    fn test_flat_string_list_is_one_record() {
        let response = r#"{"ctx": ["Unknown"]}"#;
        let verdicts =
            decode_batch_response(response, &BATCH, RecordLayout::StatusCodeSuggestion).unwrap();
        assert_eq!(verdicts["ctx"], vec![VerdictRecord::unknown()]);
    }

    #[test]
    fn test_ids_outside_batch_are_dropped() {
        let response = r#"{"ctx": [], "invented": [["Violated", "a", "b"]]}"#;
        let verdicts =
            decode_batch_response(response, &BATCH, RecordLayout::StatusCodeSuggestion).unwrap();
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts["ctx"].is_empty());
    }

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let response = r#"{"ctx": 42, "naming": [["Violated", "a", "b"]]}"#;
        let verdicts =
            decode_batch_response(response, &BATCH, RecordLayout::StatusCodeSuggestion).unwrap();
        assert!(!verdicts.contains_key("ctx"));
        assert!(verdicts.contains_key("naming"));
    }

    #[test]
    fn test_repo_layout_reads_suggestion_second() {
        let response = r#"{"ctx": [["Violated", "Add a README"]]}"#;
        let verdicts =
            decode_batch_response(response, &BATCH, RecordLayout::StatusSuggestion).unwrap();
        assert_eq!(verdicts["ctx"][0].code_snippet, None);
        assert_eq!(verdicts["ctx"][0].suggestion.as_deref(), Some("Add a README"));
    }

    #[test]
    fn test_missing_object_is_parse_error() {
        let err = decode_batch_response("I cannot help", &BATCH, RecordLayout::StatusCodeSuggestion)
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingPayload { .. }));
    }

    #[test]
    fn test_broken_json_is_parse_error() {
        let err = decode_batch_response("{\"ctx\": [", &BATCH, RecordLayout::StatusCodeSuggestion)
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingPayload { .. } | ParseError::InvalidJson(_)));
    }

    #[test]
    fn test_window_shapes() {
        assert!(decode_window_response("").unwrap().is_empty());
        assert!(decode_window_response("[]").unwrap().is_empty());

        let single = decode_window_response(r#"["Violated", "eval(x)", "Avoid eval"]"#).unwrap();
        assert_eq!(single, vec![VerdictRecord::violated("eval(x)", "Avoid eval")]);

        let many = decode_window_response(
            r#"[["Violated", "a", "b"], ["Not Violated", null, null]]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1], VerdictRecord::new(VerdictStatus::NotViolated));
    }

    #[test]
    fn test_window_single_quotes() {
        let records = decode_window_response("[['Violated', 'x = 1', 'rename x']]").unwrap();
        assert_eq!(records, vec![VerdictRecord::violated("x = 1", "rename x")]);
    }

    #[test]
    fn test_window_without_array_is_parse_error() {
        assert!(decode_window_response("no idea").is_err());
    }
}
