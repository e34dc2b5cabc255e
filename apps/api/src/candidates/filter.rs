use regex::Regex;
use serde::Deserialize;

use crate::candidates::ranking::ScoreMap;
use crate::candidates::reconcile::CandidateRecord;
use crate::models::score::ScoreResult;

lazy_static::lazy_static! {
    static ref SCORE_EXPR_RE: Regex = Regex::new(r"^([><=]?)(\d+(?:\.\d+)?)$").unwrap();
}

/// The six search boxes above the candidate table. Empty means "any".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CandidateSearch {
    pub name: String,
    pub contact: String,
    pub cv: String,
    pub created: String,
    pub score: String,
    pub summary: String,
}

impl CandidateSearch {
    pub fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.contact,
            &self.cv,
            &self.created,
            &self.score,
            &self.summary,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Greater,
    Less,
    Equal,
}

/// Parsed score search box.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreFilter {
    /// `>7.5`, `<3`, `=5` or a bare number.
    Compare(Comparison, f64),
    /// Anything else: substring of the displayed score.
    Contains(String),
}

impl ScoreFilter {
    /// `None` for a blank expression.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return None;
        }

        let parsed = SCORE_EXPR_RE.captures(expr).and_then(|caps| {
            let comparison = match caps.get(1).map(|m| m.as_str()) {
                Some(">") => Comparison::Greater,
                Some("<") => Comparison::Less,
                _ => Comparison::Equal,
            };
            let value = caps.get(2)?.as_str().parse::<f64>().ok()?;
            Some(ScoreFilter::Compare(comparison, value))
        });

        Some(parsed.unwrap_or_else(|| ScoreFilter::Contains(expr.to_lowercase())))
    }

    /// Scores that are missing or non-numeric never satisfy a comparison.
    pub fn matches(&self, result: Option<&ScoreResult>) -> bool {
        match self {
            ScoreFilter::Compare(comparison, wanted) => {
                let Some(score) = result.and_then(ScoreResult::numeric) else {
                    return false;
                };
                match comparison {
                    Comparison::Greater => score > *wanted,
                    Comparison::Less => score < *wanted,
                    Comparison::Equal => score == *wanted,
                }
            }
            ScoreFilter::Contains(needle) => result
                .map(|r| r.score_text().to_lowercase().contains(needle.as_str()))
                .unwrap_or(false),
        }
    }
}

/// Criteria compiled once per request.
struct CompiledSearch {
    name: Option<String>,
    contact: Option<String>,
    cv: Option<String>,
    created: Option<String>,
    score: Option<ScoreFilter>,
    summary: Option<String>,
}

fn needle(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

fn contains(haystack: &str, needle: &Option<String>) -> bool {
    needle
        .as_deref()
        .map_or(true, |n| haystack.to_lowercase().contains(n))
}

impl CompiledSearch {
    fn new(search: &CandidateSearch) -> Self {
        Self {
            name: needle(&search.name),
            contact: needle(&search.contact),
            cv: needle(&search.cv),
            created: needle(&search.created),
            score: ScoreFilter::parse(&search.score),
            summary: needle(&search.summary),
        }
    }

    fn matches(&self, record: &CandidateRecord, scores: &ScoreMap) -> bool {
        let score = scores.get(&record.cv_filename);

        contains(&record.name, &self.name)
            && contains(&record.contact(), &self.contact)
            && contains(&record.cv_filename, &self.cv)
            && contains(&record.created_at, &self.created)
            && self.score.as_ref().map_or(true, |f| f.matches(score))
            && contains(score.map(ScoreResult::summary).unwrap_or(""), &self.summary)
    }
}

/// Keeps the candidates matching every non-empty criterion, in input order.
pub fn filter_candidates(
    records: &[CandidateRecord],
    scores: &ScoreMap,
    search: &CandidateSearch,
) -> Vec<CandidateRecord> {
    if search.is_empty() {
        return records.to_vec();
    }

    let compiled = CompiledSearch::new(search);
    records
        .iter()
        .filter(|record| compiled.matches(record, scores))
        .cloned()
        .collect()
}
