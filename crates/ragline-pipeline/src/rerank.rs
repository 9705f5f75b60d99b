//! LLM re-ranking of retrieved candidates.
//!
//! The model sees a numbered list and answers with a ranked numbered list.
//! Each reply line must match `^\s*(\d+)\.\s*` where the number is the
//! 1-based position of a candidate. Lines that don't match, refer past the
//! end or repeat an earlier position are ignored. When nothing usable comes
//! back the original order is kept.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use ragline_core::traits::Generator;
use ragline_core::types::GenerationRequest;

fn rank_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\.\s*").expect("valid rank pattern"))
}

/// Returns 0-based candidate indices in the order the model ranked them.
pub fn parse_ranked_list(reply: &str, candidates: usize) -> Vec<usize> {
    let mut seen = vec![false; candidates];
    let mut order = Vec::new();
    for line in reply.lines() {
        let Some(caps) = rank_line().captures(line) else { continue };
        let Ok(position) = caps[1].parse::<usize>() else { continue };
        if position == 0 || position > candidates {
            continue;
        }
        let idx = position - 1;
        if !seen[idx] {
            seen[idx] = true;
            order.push(idx);
        }
    }
    order
}

#[derive(Clone)]
pub struct Reranker {
    generator: Option<Arc<dyn Generator>>,
}

impl Reranker {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator: Some(generator) }
    }

    /// A re-ranker that always keeps the incoming order.
    pub fn disabled() -> Self {
        Self { generator: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub fn prompt(query: &str, candidates: &[String]) -> String {
        let mut prompt = format!(
            "Given the query: '{query}', rank the following results from most to least relevant.\n\
             Answer with a numbered list where each line starts with the number of a result, e.g. \"2. ...\".\n"
        );
        for (i, c) in candidates.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, c));
        }
        prompt
    }

    pub async fn rerank_order(&self, query: &str, candidates: &[String]) -> Vec<usize> {
        let identity: Vec<usize> = (0..candidates.len()).collect();
        let Some(generator) = &self.generator else { return identity };
        if candidates.len() < 2 {
            return identity;
        }
        let reply = match generator.generate(&GenerationRequest::text(Self::prompt(query, candidates))).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "re-ranking failed; keeping retrieval order");
                return identity;
            }
        };
        let order = parse_ranked_list(&reply, candidates.len());
        if order.is_empty() {
            warn!("re-ranker reply had no usable lines; keeping retrieval order");
            return identity;
        }
        debug!(kept = order.len(), of = candidates.len(), "re-ranked");
        order
    }

    /// The ranked subset of `candidates`, every element taken from the input.
    pub async fn rerank(&self, query: &str, candidates: Vec<String>) -> Vec<String> {
        let order = self.rerank_order(query, &candidates).await;
        let mut slots: Vec<Option<String>> = candidates.into_iter().map(Some).collect();
        order.into_iter().filter_map(|i| slots.get_mut(i).and_then(Option::take)).collect()
    }
}
