use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use strsim::normalized_levenshtein;

pub const DEFAULT_FUZZ_CUTOFF: u8 = 70;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    pub search_term: String,
    pub fuzz_cutoff: u8,
    pub hybrid_tokens: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RulesFile {
    #[allow(dead_code)]
    version: u32,
    #[serde(default)]
    fuzz_cutoff: Option<u8>,
    #[serde(default)]
    hybrid_tokens: Option<Vec<String>>,
}

impl ClassifierRules {
    pub fn for_search_term(search_term: impl Into<String>) -> Self {
        Self {
            search_term: search_term.into(),
            fuzz_cutoff: DEFAULT_FUZZ_CUTOFF,
            hybrid_tokens: vec!["hybrid".to_string(), "híbrido".to_string()],
        }
    }

    pub fn with_fuzz_cutoff(mut self, cutoff: u8) -> Self {
        self.fuzz_cutoff = cutoff.min(100);
        self
    }

    pub fn with_rules_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file: RulesFile =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        if let Some(cutoff) = file.fuzz_cutoff {
            self = self.with_fuzz_cutoff(cutoff);
        }
        if let Some(tokens) = file.hybrid_tokens {
            self.hybrid_tokens = tokens;
        }
        Ok(self)
    }

    pub fn matches_search_term(&self, title: &str) -> bool {
        partial_ratio(&title.to_lowercase(), &self.search_term.to_lowercase()) >= self.fuzz_cutoff
    }

    pub fn is_hybrid(&self, title: &str) -> bool {
        let lowered = title.to_lowercase();
        self.hybrid_tokens
            .iter()
            .any(|token| partial_ratio(&lowered, &token.to_lowercase()) >= self.fuzz_cutoff)
    }
}

/// Best similarity (0-100) of the shorter string against every equal-length window of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }

    let needle: String = short.iter().collect();
    let best = long
        .windows(short.len())
        .map(|window| normalized_levenshtein(&needle, &window.iter().collect::<String>()))
        .fold(0.0_f64, f64::max);
    (best * 100.0).round() as u8
}
