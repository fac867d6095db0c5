//! Append-only question history for one session, with filters and aggregate stats.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{BloomLevel, ClassificationResult, QuestionRecord};

/// Relevance filter over the history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceFilter {
  #[default]
  All,
  Relevant,
  Irrelevant,
}

impl RelevanceFilter {
  fn accepts(self, is_relevant: bool) -> bool {
    match self {
      RelevanceFilter::All => true,
      RelevanceFilter::Relevant => is_relevant,
      RelevanceFilter::Irrelevant => !is_relevant,
    }
  }
}

/// Combined filter: relevance plus an optional Bloom level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct HistoryFilter {
  #[serde(default)]
  pub relevance: RelevanceFilter,
  #[serde(default)]
  pub level: Option<BloomLevel>,
}

impl HistoryFilter {
  pub fn matches(&self, rec: &QuestionRecord) -> bool {
    self.relevance.accepts(rec.result.is_relevant)
      && self.level.map_or(true, |lvl| rec.result.bloom_level == lvl)
  }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct HistoryStats {
  pub total: usize,
  pub relevant: usize,
  pub irrelevant: usize,
  /// Count per level label; all six levels plus 미분류 are always present.
  pub by_level: BTreeMap<String, usize>,
  pub mean_quality: Option<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct History {
  records: Vec<QuestionRecord>,
}

impl History {
  /// Append a record; its position is the current length.
  pub fn append(&mut self, question: String, result: ClassificationResult) -> &QuestionRecord {
    let position = self.len();
    self.records.push(QuestionRecord { position, question, result });
    &self.records[position]
  }

  pub fn records(&self) -> &[QuestionRecord] { &self.records }

  pub fn len(&self) -> usize { self.records.len() }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn reset(&mut self) { self.records.clear(); }

  pub fn filtered(&self, filter: &HistoryFilter) -> Vec<QuestionRecord> {
    self.records().iter().filter(|r| filter.matches(r)).cloned().collect()
  }

  pub fn stats(&self) -> HistoryStats {
    let mut by_level: BTreeMap<String, usize> = BloomLevel::ALL
      .iter()
      .chain(std::iter::once(&BloomLevel::Unclassified))
      .map(|lvl| (lvl.label().to_string(), 0))
      .collect();

    let mut relevant = 0usize;
    let mut score_sum = 0u32;
    for rec in self.records() {
      if rec.result.is_relevant { relevant += 1; }
      score_sum += u32::from(rec.result.quality_score);
      *by_level.entry(rec.result.bloom_level.label().to_string()).or_insert(0) += 1;
    }

    let total = self.len();
    HistoryStats {
      total,
      relevant,
      irrelevant: total - relevant,
      by_level,
      mean_quality: (total > 0).then(|| score_sum as f32 / total as f32),
    }
  }
}
