//! Enrichment Oracle
//!
//! Optional external collaborator that turns a raw tool invocation into a
//! subtitle, narrative, facts, and concepts. The oracle may refuse (return
//! `None`) or exceed its timeout; both fall back to the deterministic
//! templates in `classify`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classify::truncate_chars;

/// Default oracle timeout.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(15);

const MAX_FACTS: usize = 5;
const MAX_FACT_CHARS: usize = 200;
const MAX_CONCEPTS: usize = 5;
const MAX_CONCEPT_CHARS: usize = 50;

/// Oracle output applied onto an observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
}

impl Enrichment {
    /// Enforce the size caps: at most 5 facts of 200 chars and 5 concepts
    /// of 50 chars.
    pub fn clamped(mut self) -> Self {
        self.facts.truncate(MAX_FACTS);
        for fact in &mut self.facts {
            if fact.chars().count() > MAX_FACT_CHARS {
                *fact = truncate_chars(fact, MAX_FACT_CHARS).to_string();
            }
        }
        self.concepts.truncate(MAX_CONCEPTS);
        for concept in &mut self.concepts {
            if concept.chars().count() > MAX_CONCEPT_CHARS {
                *concept = truncate_chars(concept, MAX_CONCEPT_CHARS).to_string();
            }
        }
        self
    }
}

/// External enrichment capability.
#[async_trait]
pub trait EnrichmentOracle: Send + Sync {
    /// Enrich one tool invocation. `None` means "use the deterministic
    /// fallback".
    async fn enrich(
        &self,
        tool_name: &str,
        tool_input: Option<&Value>,
        tool_response: Option<&Value>,
    ) -> Option<Enrichment>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_caps_counts_and_lengths() {
        let enrichment = Enrichment {
            subtitle: Some("s".to_string()),
            narrative: None,
            facts: (0..8).map(|i| format!("fact-{i}-{}", "x".repeat(300))).collect(),
            concepts: (0..8).map(|i| format!("concept-{i}-{}", "y".repeat(100))).collect(),
        }
        .clamped();

        assert_eq!(enrichment.facts.len(), 5);
        assert_eq!(enrichment.concepts.len(), 5);
        for fact in &enrichment.facts {
            assert!(fact.chars().count() <= 200);
        }
        for concept in &enrichment.concepts {
            assert!(concept.chars().count() <= 50);
        }
    }

    #[test]
    fn test_clamp_leaves_small_output_alone() {
        let enrichment = Enrichment {
            subtitle: None,
            narrative: Some("n".to_string()),
            facts: vec!["one".to_string()],
            concepts: vec!["two".to_string()],
        };
        let clamped = enrichment.clone().clamped();
        assert_eq!(clamped, enrichment);
    }
}
