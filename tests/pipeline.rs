use chaos_reviewer::error::ProviderError;
use chaos_reviewer::llm::{GenerateFuture, GenerationRequest, Generator, PromptStyle, ProviderChain};
use chaos_reviewer::quips::{QuipTable, RemarkSelector};
use chaos_reviewer::reply::{Reviewer, PRAISE_LINE, PROVIDE_ERROR_LINE};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Generator that never produces text.
#[derive(Default)]
struct Unreachable {
    calls: AtomicUsize,
}

impl Generator for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn generate<'a>(&'a self, _request: &'a GenerationRequest) -> GenerateFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(ProviderError::EmptyResponse) })
    }
}

fn reviewer_with(chain: ProviderChain) -> Reviewer {
    Reviewer::with_selector(chain, PromptStyle::Neutral, RemarkSelector::seeded(2024))
}

fn in_tables(remark: &str, tables: &[QuipTable]) -> bool {
    tables.iter().any(|table| table.contains(remark))
}

#[tokio::test]
async fn compiler_error_envelope() {
    let reviewer = reviewer_with(ProviderChain::offline());
    let reply = reviewer
        .respond(r#"{"log_tail": "main.c:10: error: control reaches end of non-void function"}"#)
        .await
        .expect("non-empty input gets a reply");

    assert!(reply.part_one.contains("main.c:10"));
    assert!(reply.part_one.contains("add a return on all paths"));
    assert!(!reply.part_two.is_empty());
    assert!(in_tables(
        &reply.part_two,
        &[QuipTable::CFamily, QuipTable::Default, QuipTable::Flavor]
    ));
}

#[tokio::test]
async fn greeting_text_envelope() {
    let reviewer = reviewer_with(ProviderChain::offline());
    let reply = reviewer.respond(r#"{"text": "hello there"}"#).await.unwrap();

    assert_eq!(reply.part_one, PROVIDE_ERROR_LINE);
    assert!(in_tables(&reply.part_two, &[QuipTable::Default, QuipTable::Flavor]));
}

#[tokio::test]
async fn praise_text_envelope() {
    let reviewer = reviewer_with(ProviderChain::offline());
    let reply = reviewer.respond(r#"{"text": "thanks so much!!"}"#).await.unwrap();

    assert_eq!(reply.part_one, PRAISE_LINE);
}

#[tokio::test]
async fn keyword_fallback_gets_basic_remark() {
    let reviewer = reviewer_with(ProviderChain::offline());
    let reply = reviewer
        .respond("~~ zzz 0x1f the widget build failed somewhere ~~")
        .await
        .unwrap();

    assert_eq!(reply.part_two, "Negative Aura");
    assert!(QuipTable::Basic.contains(&reply.part_two));
    assert!(!reply.part_one.contains("(unknown)"));
}

#[tokio::test]
async fn unreachable_oracle_falls_back_to_rules() {
    let oracle = Arc::new(Unreachable::default());
    let reviewer = reviewer_with(ProviderChain::new(vec![oracle.clone() as Arc<dyn Generator>]));

    let reply = reviewer
        .respond("ModuleNotFoundError: No module named 'requests'")
        .await
        .unwrap();

    assert!(reply.part_one.contains("not installed"));
    assert!(!reply.part_one.contains("Solution:"));
    // One attempt for the fix, one for the explanation.
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn blank_message_is_ignored() {
    let reviewer = reviewer_with(ProviderChain::offline());
    assert!(reviewer.respond("").await.is_none());
    assert!(reviewer.respond(" \n\t ").await.is_none());
}

#[tokio::test]
async fn traceback_location_and_python_remark() {
    let reviewer = reviewer_with(ProviderChain::offline());
    let log = "Traceback (most recent call last):\n  File \"app/main.py\", line 12, in <module>\n    run()\nZeroDivisionError: division by zero";
    let reply = reviewer.respond(log).await.unwrap();

    assert!(reply.part_one.starts_with("app/main.py:12 — "));
    assert!(in_tables(&reply.part_two, &[QuipTable::Python, QuipTable::Flavor]));
}
