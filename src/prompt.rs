//! Prompt builder for question classification and learning-path generation.
//!
//! Templates are rendered with `util::fill_template` (single pass, `{{`/`}}` escapes).
//! The JSON schema example lives in its own constant and is inserted as a value,
//! so its braces never meet the placeholder syntax.

use crate::config::Prompts;
use crate::util::fill_template;

/// The exact JSON shape the model is asked to return. The normalizer tolerates drift from it.
pub const CLASSIFICATION_SCHEMA_EXAMPLE: &str = r#"{
  "relevance": {
    "is_relevant": true,
    "reason": "질문이 수업 내용의 핵심 개념을 직접 다룹니다."
  },
  "bloom_taxonomy": {
    "level": "이해",
    "explanation": "개념의 의미를 자신의 말로 설명하도록 요구합니다."
  },
  "question_quality": {
    "score": 4,
    "feedback": "구체적이지만 예시를 덧붙이면 더 좋습니다."
  }
}"#;

pub const DEFAULT_CLASSIFICATION_TEMPLATE: &str = "\
당신은 교사를 돕는 교육 평가 전문가입니다.
아래 수업 내용을 기준으로 학생의 질문을 분석하세요.

[수업 내용]
{curriculum}

[학생 질문]
{question}

다음 세 가지를 판단하세요.
1. 관련성: 질문이 수업 내용과 관련이 있는지 (true/false)와 그 이유
2. 블룸의 교육목표 분류: 기억, 이해, 적용, 분석, 평가, 창조 중 하나와 그 근거
3. 질문의 질: 1~5점 점수와 개선을 위한 피드백

반드시 아래 형식의 JSON으로만 답하세요. 다른 설명은 덧붙이지 마세요.
```json
{schema_example}
```";

pub const DEFAULT_LEARNING_PATH_TEMPLATE: &str = "\
당신은 학생 맞춤형 학습 설계 전문가입니다.
아래 수업 내용과 학생의 질문을 바탕으로 학습 경로를 제안하세요.

[수업 내용]
{curriculum}

[학생 질문]
{question}

다음 순서로 작성하세요.
1. 질문에 답하기 위해 먼저 알아야 할 선수 개념
2. 단계별 학습 순서 (3~5단계, 블룸의 교육목표 분류 수준이 점차 높아지도록)
3. 각 단계에서 해볼 수 있는 활동이나 탐구 질문
4. 학습을 마친 뒤 스스로 점검할 수 있는 확인 질문 2개";

/// Render the classification prompt for one question.
pub fn build_classification_prompt(prompts: &Prompts, curriculum: &str, question: &str) -> String {
  fill_template(
    &prompts.classification_template,
    &[
      ("curriculum", curriculum),
      ("question", question),
      ("schema_example", CLASSIFICATION_SCHEMA_EXAMPLE),
    ],
  )
}

/// Render the learning-path prompt. Its answer is shown to the user as-is.
pub fn build_learning_path_prompt(prompts: &Prompts, curriculum: &str, question: &str) -> String {
  fill_template(
    &prompts.learning_path_template,
    &[("curriculum", curriculum), ("question", question)],
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification_prompt_embeds_inputs_and_schema() {
    let p = build_classification_prompt(&Prompts::default(), "일차함수의 그래프", "기울기가 뭐예요?");
    assert!(p.contains("일차함수의 그래프"));
    assert!(p.contains("기울기가 뭐예요?"));
    assert!(p.contains(CLASSIFICATION_SCHEMA_EXAMPLE));
    assert!(!p.contains("{schema_example}"));
    assert!(!p.contains("{curriculum}"));
  }

  #[test]
  fn schema_example_names_every_expected_field() {
    let v: serde_json::Value = serde_json::from_str(CLASSIFICATION_SCHEMA_EXAMPLE).unwrap();
    assert!(v["relevance"]["is_relevant"].is_boolean());
    assert!(v["relevance"]["reason"].is_string());
    assert!(v["bloom_taxonomy"]["level"].is_string());
    assert!(v["bloom_taxonomy"]["explanation"].is_string());
    assert!(v["question_quality"]["score"].is_u64());
    assert!(v["question_quality"]["feedback"].is_string());
  }

  #[test]
  fn braces_in_user_text_survive_verbatim() {
    let curriculum = "집합 {1, 2, 3}과 {question} 표기";
    let question = "{\"relevance\": 1} 은 무슨 뜻인가요? {curriculum}";
    let p = build_classification_prompt(&Prompts::default(), curriculum, question);
    assert!(p.contains(curriculum));
    assert!(p.contains(question));
    // the question placeholder appears exactly once in the rendered text: inside the curriculum
    assert_eq!(p.matches("{question}").count(), 1);
  }

  #[test]
  fn learning_path_prompt_uses_its_own_template() {
    let prompts = Prompts {
      learning_path_template: "C={curriculum};Q={question};{{literal}}".into(),
      ..Prompts::default()
    };
    let p = build_learning_path_prompt(&prompts, "광합성", "왜 잎은 초록색인가요?");
    assert_eq!(p, "C=광합성;Q=왜 잎은 초록색인가요?;{literal}");
  }

  #[test]
  fn default_learning_path_prompt_has_no_schema() {
    let p = build_learning_path_prompt(&Prompts::default(), "광합성", "질문");
    assert!(p.contains("광합성"));
    assert!(!p.contains("bloom_taxonomy"));
  }
}
