//! Response normalizer: turns free-form model output into a `ClassificationResult`.
//!
//! Two stages:
//! 1. Extraction. An ordered list of strategies each proposes a candidate span;
//!    the first span that decodes to a JSON *object* wins. No strategy can fail the
//!    request, and when all of them miss the caller gets `None`.
//! 2. Projection. `ClassificationResult::from_value` reads the decoded mapping
//!    and replaces every missing or ill-typed field with its default.
//!
//! The presentation lookup (CSS-ish classes and labels for the UI) lives here too.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::domain::{BloomLevel, ClassificationResult};
use crate::util::{cap_chars, trunc_for_log};

pub const DEFAULT_QUALITY_SCORE: u8 = 3;
pub const DEFAULT_MAX_FIELD_CHARS: usize = 2000;
const QUALITY_MIN: f64 = 1.0;
const QUALITY_MAX: f64 = 5.0;

type Extractor = fn(&str) -> Option<&str>;

/// Extraction strategies, tried in order.
const STRATEGIES: [(&str, Extractor); 4] = [
  ("json_fence", extract_json_fence),
  ("any_fence", extract_any_fence),
  ("outer_braces", extract_outer_braces),
  ("whole_text", extract_whole_text),
];

/// Interior of the first ```` ```json ```` block (tag matched case-insensitively).
/// An unterminated block runs to the end of the text.
fn extract_json_fence(text: &str) -> Option<&str> {
  let start = text.to_ascii_lowercase().find("```json")?;
  Some(fence_interior(&text[start + "```json".len()..]))
}

/// Interior of the first ```` ``` ```` block, whatever its tag.
fn extract_any_fence(text: &str) -> Option<&str> {
  let start = text.find("```")?;
  Some(fence_interior(&text[start + "```".len()..]))
}

fn fence_interior(after_open: &str) -> &str {
  match after_open.find("```") {
    Some(end) => &after_open[..end],
    None => after_open,
  }
}

/// Greedy outermost span: first `{` through last `}`.
fn extract_outer_braces(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  (end > start).then(|| &text[start..=end])
}

fn extract_whole_text(text: &str) -> Option<&str> {
  let t = text.trim();
  (!t.is_empty()).then_some(t)
}

/// Decode a candidate span; only JSON objects count as a hit.
fn decode_object(candidate: &str) -> Option<Map<String, Value>> {
  match serde_json::from_str::<Value>(candidate.trim()) {
    Ok(Value::Object(map)) => Some(map),
    _ => None,
  }
}

/// Run the strategies in order and return the first decoded object with the
/// name of the strategy that produced it.
pub fn extract_object(raw: &str) -> Option<(&'static str, Map<String, Value>)> {
  STRATEGIES.iter().find_map(|(name, extract)| {
    let candidate = extract(raw)?;
    decode_object(candidate).map(|obj| (*name, obj))
  })
}

/// Stateless apart from the free-text cap; cheap to clone into handlers.
#[derive(Clone, Debug)]
pub struct ResponseNormalizer {
  max_field_chars: usize,
}

impl Default for ResponseNormalizer {
  fn default() -> Self { Self::new(DEFAULT_MAX_FIELD_CHARS) }
}

impl ResponseNormalizer {
  pub fn new(max_field_chars: usize) -> Self { Self { max_field_chars } }

  /// Parse raw model output. Never panics and never errors: `None` means no JSON
  /// object could be found at all.
  #[instrument(level = "debug", skip(self, raw), fields(raw_len = raw.len()))]
  pub fn parse(&self, raw: &str) -> Option<ClassificationResult> {
    match extract_object(raw) {
      Some((strategy, obj)) => {
        debug!(target: "classifier", strategy, "JSON object extracted");
        Some(ClassificationResult::from_value(&obj, self.max_field_chars))
      }
      None => {
        warn!(target: "classifier", raw = %trunc_for_log(raw, 200), "No JSON object found in model output");
        None
      }
    }
  }
}

/// Parse with the default field cap.
#[cfg(test)]
pub fn parse_classification(raw: &str) -> Option<ClassificationResult> {
  ResponseNormalizer::default().parse(raw)
}

impl ClassificationResult {
  /// Build a result from a loosely typed mapping. Total: every field has a default.
  pub fn from_value(obj: &Map<String, Value>, max_field_chars: usize) -> Self {
    let (result, defaulted) = project(obj, max_field_chars);
    if !defaulted.is_empty() {
      debug!(target: "classifier", ?defaulted, "Fields defaulted during projection");
    }
    result
  }
}

/// Projection plus the names of the fields that fell back to their default.
fn project(obj: &Map<String, Value>, max_field_chars: usize) -> (ClassificationResult, Vec<&'static str>) {
  let relevance = section(obj, "relevance");
  let bloom = section(obj, "bloom_taxonomy");
  let quality = section(obj, "question_quality");
  let mut defaulted = Vec::new();

  let is_relevant = match field(relevance, "is_relevant") {
    Some(Value::Bool(b)) => *b,
    _ => {
      defaulted.push("is_relevant");
      false
    }
  };

  let bloom_level = match field(bloom, "level") {
    Some(Value::String(s)) => BloomLevel::from_label(s),
    _ => BloomLevel::Unclassified,
  };
  if bloom_level == BloomLevel::Unclassified {
    defaulted.push("bloom_level");
  }

  let quality_score = field(quality, "score").and_then(coerce_score).unwrap_or_else(|| {
    defaulted.push("quality_score");
    DEFAULT_QUALITY_SCORE
  });

  let relevance_reason = text_field(relevance, "reason", max_field_chars)
    .unwrap_or_else(|| { defaulted.push("relevance_reason"); String::new() });
  let bloom_explanation = text_field(bloom, "explanation", max_field_chars)
    .unwrap_or_else(|| { defaulted.push("bloom_explanation"); String::new() });
  let quality_feedback = text_field(quality, "feedback", max_field_chars)
    .unwrap_or_else(|| { defaulted.push("quality_feedback"); String::new() });

  let result = ClassificationResult {
    is_relevant,
    relevance_reason,
    bloom_level,
    bloom_explanation,
    quality_score,
    quality_feedback,
  };
  (result, defaulted)
}

fn section<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
  obj.get(key).and_then(Value::as_object)
}

fn field<'a>(section: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Value> {
  section.and_then(|s| s.get(key))
}

fn text_field(section: Option<&Map<String, Value>>, key: &str, max_chars: usize) -> Option<String> {
  field(section, key).and_then(coerce_text).map(|s| cap_chars(&s, max_chars))
}

/// Numbers and numeric-looking strings are rounded and clamped into 1..=5,
/// infinities included. Anything else (text, null, bool, NaN) has no score.
fn coerce_score(v: &Value) -> Option<u8> {
  let n = match v {
    Value::Number(n) => n.as_f64()?,
    Value::String(s) => s.trim().parse::<f64>().ok()?,
    _ => return None,
  };
  if n.is_nan() {
    return None;
  }
  Some(n.round().clamp(QUALITY_MIN, QUALITY_MAX) as u8)
}

fn coerce_text(v: &Value) -> Option<String> {
  match v {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

// --- Presentation lookup ---

/// Style tag per level. Unclassified borrows the "remember" style.
pub fn presentation_tag(level: BloomLevel) -> &'static str {
  match level {
    BloomLevel::Remember => "bloom-remember",
    BloomLevel::Understand => "bloom-understand",
    BloomLevel::Apply => "bloom-apply",
    BloomLevel::Analyze => "bloom-analyze",
    BloomLevel::Evaluate => "bloom-evaluate",
    BloomLevel::Create => "bloom-create",
    BloomLevel::Unclassified => "bloom-remember",
  }
}

pub fn relevance_class(is_relevant: bool) -> &'static str {
  if is_relevant { "relevant" } else { "irrelevant" }
}

pub fn relevance_text(is_relevant: bool) -> &'static str {
  if is_relevant { "✅ 수업 관련" } else { "❌ 수업 무관" }
}

/// Render hints shipped alongside a result.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Presentation {
  pub bloom_class: &'static str,
  pub relevance_class: &'static str,
  pub relevance_text: &'static str,
}

impl Presentation {
  pub fn for_result(r: &ClassificationResult) -> Self {
    Self {
      bloom_class: presentation_tag(r.bloom_level),
      relevance_class: relevance_class(r.is_relevant),
      relevance_text: relevance_text(r.is_relevant),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prompt::CLASSIFICATION_SCHEMA_EXAMPLE;
  use serde_json::json;

  fn obj(v: Value) -> Map<String, Value> {
    match v {
      Value::Object(m) => m,
      other => panic!("not an object: {other}"),
    }
  }

  fn score_of(v: Value) -> u8 {
    let m = obj(json!({ "question_quality": { "score": v } }));
    project(&m, DEFAULT_MAX_FIELD_CHARS).0.quality_score
  }

  // ── extraction ───────────────────────────────────────────────

  #[test]
  fn canonical_schema_example_has_no_defaulted_fields() {
    let m = decode_object(CLASSIFICATION_SCHEMA_EXAMPLE).unwrap();
    let (r, defaulted) = project(&m, DEFAULT_MAX_FIELD_CHARS);
    assert!(defaulted.is_empty(), "defaulted: {defaulted:?}");
    assert!(r.is_relevant);
    assert_eq!(r.bloom_level, BloomLevel::Understand);
    assert_eq!(r.quality_score, 4);
    assert!(!r.relevance_reason.is_empty());
  }

  #[test]
  fn end_to_end_fenced_reply() {
    let raw = "Here is the analysis:\n```json\n{\"relevance\":{\"is_relevant\":true,\"reason\":\"다룬다\"},\"bloom_taxonomy\":{\"level\":\"분석\",\"explanation\":\"분해\"},\"question_quality\":{\"score\":4,\"feedback\":\"좋음\"}}\n```";
    let (strategy, m) = extract_object(raw).unwrap();
    assert_eq!(strategy, "json_fence");
    let (r, defaulted) = project(&m, DEFAULT_MAX_FIELD_CHARS);
    assert!(defaulted.is_empty());
    assert!(r.is_relevant);
    assert_eq!(r.relevance_reason, "다룬다");
    assert_eq!(r.bloom_level, BloomLevel::Analyze);
    assert_eq!(r.bloom_explanation, "분해");
    assert_eq!(r.quality_score, 4);
    assert_eq!(r.quality_feedback, "좋음");
  }

  #[test]
  fn tagged_fence_beats_later_bare_object() {
    let raw = "```json\n{\"relevance\":{\"is_relevant\":true}}\n```\nOr maybe: {\"relevance\":{\"is_relevant\":false}}";
    let r = parse_classification(raw).unwrap();
    assert!(r.is_relevant);
  }

  #[test]
  fn uppercase_tag_and_unterminated_fence() {
    let raw = "```JSON\n{\"bloom_taxonomy\":{\"level\":\"평가\"}}";
    let (strategy, m) = extract_object(raw).unwrap();
    assert_eq!(strategy, "json_fence");
    assert_eq!(project(&m, 10).0.bloom_level, BloomLevel::Evaluate);
  }

  #[test]
  fn untagged_fence_is_second_choice() {
    let raw = "Result\n```\n{\"question_quality\":{\"score\":5}}\n```";
    let (strategy, _) = extract_object(raw).unwrap();
    assert_eq!(strategy, "any_fence");
  }

  #[test]
  fn broken_fence_falls_through_to_outer_braces() {
    let raw = "```json\nnot json at all\n```\n{\"question_quality\":{\"score\":2}}";
    let (strategy, m) = extract_object(raw).unwrap();
    assert_eq!(strategy, "outer_braces");
    assert_eq!(project(&m, 10).0.quality_score, 2);
  }

  #[test]
  fn prose_around_bare_object() {
    let raw = "분석 결과입니다: {\"relevance\":{\"is_relevant\":true,\"reason\":\"집합 {A}를 다룸\"}} 도움이 되길 바랍니다.";
    let r = parse_classification(raw).unwrap();
    assert!(r.is_relevant);
    assert_eq!(r.relevance_reason, "집합 {A}를 다룸");
  }

  #[test]
  fn brace_span_precedes_whole_text() {
    let (strategy, _) = extract_object("  {}  ").map(|(s, m)| (s, m.len())).unwrap();
    // "{}" is found by the brace span before the whole-text pass
    assert_eq!(strategy, "outer_braces");
    assert!(extract_whole_text("   ").is_none());
  }

  #[test]
  fn no_json_yields_none() {
    assert!(parse_classification("Sorry, I cannot comply.").is_none());
    assert!(parse_classification("").is_none());
    assert!(parse_classification("[1, 2, 3]").is_none());
  }

  #[test]
  fn degenerate_inputs_do_not_panic() {
    for raw in ["{", "}", "}{", "```", "```json", "``````", "```json```", "{{{}", "\u{feff}{"] {
      assert!(parse_classification(raw).is_none(), "input {raw:?}");
    }
  }

  // ── projection ───────────────────────────────────────────────

  #[test]
  fn quality_score_coercion() {
    assert_eq!(score_of(json!(0)), 1);
    assert_eq!(score_of(json!("7")), 5);
    assert_eq!(score_of(json!("abc")), DEFAULT_QUALITY_SCORE);
    assert_eq!(score_of(Value::Null), DEFAULT_QUALITY_SCORE);
    assert_eq!(score_of(json!(-3)), 1);
    assert_eq!(score_of(json!(100)), 5);
    assert_eq!(score_of(json!(4.6)), 5);
    assert_eq!(score_of(json!(" 2.4 ")), 2);
    assert_eq!(score_of(json!(" 4 ")), 4);
    assert_eq!(score_of(json!(true)), DEFAULT_QUALITY_SCORE);
    assert_eq!(score_of(json!("NaN")), DEFAULT_QUALITY_SCORE);
  }

  #[test]
  fn unbounded_numeric_strings_clamp_to_the_nearest_bound() {
    assert_eq!(score_of(json!("inf")), 5);
    assert_eq!(score_of(json!("1e400")), 5);
    assert_eq!(score_of(json!("-inf")), 1);
    assert_eq!(score_of(json!("-1e400")), 1);
  }

  #[test]
  fn missing_score_defaults_to_three() {
    let (r, defaulted) = project(&obj(json!({})), DEFAULT_MAX_FIELD_CHARS);
    assert_eq!(r.quality_score, DEFAULT_QUALITY_SCORE);
    assert!(defaulted.contains(&"quality_score"));
  }

  #[test]
  fn unknown_level_is_unclassified() {
    let m = obj(json!({ "bloom_taxonomy": { "level": "종합", "explanation": "x" } }));
    let (r, defaulted) = project(&m, DEFAULT_MAX_FIELD_CHARS);
    assert_eq!(r.bloom_level, BloomLevel::Unclassified);
    assert!(defaulted.contains(&"bloom_level"));
    assert_eq!(r.bloom_explanation, "x");
  }

  #[test]
  fn ill_typed_sections_fall_back_to_defaults() {
    let m = obj(json!({ "relevance": "yes", "bloom_taxonomy": null, "question_quality": [1] }));
    let (r, defaulted) = project(&m, DEFAULT_MAX_FIELD_CHARS);
    assert!(!r.is_relevant);
    assert_eq!(r.bloom_level, BloomLevel::Unclassified);
    assert_eq!(r.quality_score, DEFAULT_QUALITY_SCORE);
    assert_eq!(r.relevance_reason, "");
    assert_eq!(defaulted.len(), 6);
  }

  #[test]
  fn is_relevant_requires_a_real_bool() {
    let m = obj(json!({ "relevance": { "is_relevant": "true" } }));
    assert!(!project(&m, DEFAULT_MAX_FIELD_CHARS).0.is_relevant);
  }

  #[test]
  fn scalar_text_fields_are_rendered_and_capped() {
    let m = obj(json!({
      "relevance": { "reason": 42 },
      "question_quality": { "feedback": "아주 길고 자세한 피드백" }
    }));
    let r = ResponseNormalizer::new(4);
    let (res, _) = project(&m, r.max_field_chars);
    assert_eq!(res.relevance_reason, "42");
    assert_eq!(res.quality_feedback, "아주 길…");
  }

  #[test]
  fn extra_and_reordered_fields_are_ignored() {
    let raw = r#"{"question_quality":{"feedback":"ok","score":"5"},"extra":1,"bloom_taxonomy":{"explanation":"e","level":"창조"},"relevance":{"reason":"r","is_relevant":false}}"#;
    let r = parse_classification(raw).unwrap();
    assert_eq!(r.bloom_level, BloomLevel::Create);
    assert_eq!(r.quality_score, 5);
    assert!(!r.is_relevant);
  }

  // ── presentation ─────────────────────────────────────────────

  #[test]
  fn every_level_has_a_tag() {
    for lvl in BloomLevel::ALL {
      assert!(presentation_tag(lvl).starts_with("bloom-"));
    }
    assert_eq!(presentation_tag(BloomLevel::Unclassified), "bloom-remember");
    assert_eq!(presentation_tag(BloomLevel::Analyze), "bloom-analyze");
  }

  #[test]
  fn presentation_for_result() {
    let r = parse_classification(CLASSIFICATION_SCHEMA_EXAMPLE).unwrap();
    let p = Presentation::for_result(&r);
    assert_eq!(p.bloom_class, "bloom-understand");
    assert_eq!(p.relevance_class, "relevant");
    assert_eq!(p.relevance_text, "✅ 수업 관련");
  }
}
