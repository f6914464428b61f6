use crate::config::PipelineConfig;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;

/// Turns raw recognizer tokens into a deduplicated, bounded candidate list.
///
/// Per token: trim, apply the confusion-correction map, strip everything
/// outside the plate charset, optionally check the plate grammar. Candidate
/// order is recognizer order; the extractor never re-sorts.
pub struct CandidateNormalizer {
    charset: HashSet<char>,
    confusion_map: Vec<(char, char)>,
    grammar: Option<Regex>,
    max_candidates: usize,
}

impl CandidateNormalizer {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let grammar = config
            .plate_grammar
            .as_deref()
            .map(|pattern| Regex::new(pattern).context("invalid plate grammar"))
            .transpose()?;

        Ok(Self {
            charset: config.charset.chars().collect(),
            confusion_map: config.confusion_map.clone(),
            grammar,
            max_candidates: config.max_candidates,
        })
    }

    /// Normalize a single raw token. Returns None when nothing usable is left.
    pub fn normalize_token(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let corrected: String = trimmed
            .chars()
            .map(|c| {
                self.confusion_map
                    .iter()
                    .find(|(from, _)| *from == c)
                    .map(|(_, to)| *to)
                    .unwrap_or(c)
            })
            .filter(|c| self.charset.contains(c))
            .collect();

        if corrected.is_empty() {
            return None;
        }
        if let Some(grammar) = &self.grammar {
            if !grammar.is_match(&corrected) {
                return None;
            }
        }
        Some(corrected)
    }

    /// Normalize, deduplicate preserving first-seen order, truncate to the
    /// configured bound.
    pub fn extract<I>(&self, raw_tokens: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for raw in raw_tokens {
            let Some(candidate) = self.normalize_token(&raw) else {
                continue;
            };
            if seen.insert(candidate.clone()) {
                candidates.push(candidate);
                if candidates.len() == self.max_candidates {
                    break;
                }
            }
        }
        candidates
    }
}
