mod common;

use std::sync::Arc;

use common::Scripted;
use ragline_pipeline::rerank::{parse_ranked_list, Reranker};

fn candidates() -> Vec<String> {
    vec!["alpha".into(), "beta".into(), "gamma".into()]
}

#[test]
fn parser_drops_bad_out_of_range_and_duplicate_lines() {
    let reply = "Here is the ranking:\n2. beta\n  1.alpha\n2. beta again\n0. nothing\n7. too far\n- 3. bullet\nthree. gamma\n3. gamma";
    assert_eq!(parse_ranked_list(reply, 3), vec![1, 0, 2]);
    assert!(parse_ranked_list("no numbers here", 3).is_empty());
    assert!(parse_ranked_list("1. a", 0).is_empty());
}

#[tokio::test]
async fn rerank_returns_subset_in_model_order() {
    let gen = Scripted::new(|_| Ok("3. gamma\n1. alpha".into()));
    let reranker = Reranker::new(gen.clone());
    let out = reranker.rerank("q", candidates()).await;
    assert_eq!(out, vec!["gamma".to_string(), "alpha".to_string()]);
    assert!(out.iter().all(|c| candidates().contains(c)));

    let prompt = gen.seen.lock()[0].prompt_text();
    assert!(prompt.contains("Given the query: 'q'"));
    assert!(prompt.contains("1. alpha\n2. beta\n3. gamma"));
}

#[tokio::test]
async fn failure_or_garbage_keeps_identity_order() {
    let failing = Reranker::new(Scripted::failing());
    assert_eq!(failing.rerank("q", candidates()).await, candidates());

    let garbage = Reranker::new(Scripted::new(|_| Ok("I cannot rank these.".into())));
    assert_eq!(garbage.rerank_order("q", &candidates()).await, vec![0, 1, 2]);

    assert_eq!(Reranker::disabled().rerank("q", candidates()).await, candidates());
}

#[tokio::test]
async fn single_candidate_skips_the_model() {
    let gen = Scripted::new(|_| Ok("1. x".into()));
    let reranker = Reranker::new(gen.clone() as Arc<dyn ragline_core::traits::Generator>);
    assert_eq!(reranker.rerank("q", vec!["only".into()]).await, vec!["only".to_string()]);
    assert!(reranker.rerank("q", Vec::new()).await.is_empty());
    assert_eq!(gen.calls(), 0);
}
