use std::future::ready;

use scout::core::ErrorKind;
use scout::core::checkpoint::{CheckpointStore, FileCheckpointStore};
use scout::tools::{
    SearchBackend, SearchError, SearchResponse, SearchResult, WebSearchTool,
};
use scout::{
    FALLBACK_QUESTION, RenderStyle, Renderer, Repl, ReplExit, SessionBuilder,
};
use scout_model::{ErrorKind as ModelErrorKind, ModelMessage, ToolCallRequest};
use scout_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde_json::json;

struct StubSearch;

impl SearchBackend for StubSearch {
    fn search(
        &self,
        query: &str,
        _max_results: u32,
    ) -> impl Future<Output = Result<SearchResponse, SearchError>> + Send + 'static + use<>
    {
        ready(Ok(SearchResponse {
            query: query.to_owned(),
            results: vec![SearchResult {
                title: "Forecast".to_owned(),
                url: "https://example.com/forecast".to_owned(),
                content: "Sunny all day.".to_owned(),
                score: 0.9,
            }],
        }))
    }
}

fn search_call() -> PresetEvent {
    PresetEvent::ToolCall(ToolCallRequest {
        id: "toolu_01".to_owned(),
        name: "tavily_search".to_owned(),
        arguments: json!({ "query": "weather today" }),
    })
}

async fn run_repl(
    provider: TestModelProvider,
    style: RenderStyle,
    input: &str,
) -> (ReplExit, String, usize) {
    let session = SessionBuilder::with_model_provider(provider)
        .with_web_search(WebSearchTool::new(StubSearch))
        .build();
    let mut output = vec![];
    let mut repl = Repl::new(
        session,
        input.as_bytes(),
        &mut output,
        Renderer::new(style),
    );
    let exit = repl.run().await.unwrap();
    let committed = repl.session().conversation().len();
    drop(repl);
    (exit, String::from_utf8(output).unwrap(), committed)
}

#[tokio::test]
async fn test_answer_then_quit() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider
        .add_assistant_response_step(PresetResponse::with_text("Hi there!"));

    let (exit, output, committed) =
        run_repl(provider, RenderStyle::Plain, "Hello\nquit\n").await;
    assert!(matches!(exit, ReplExit::Quit));
    assert_eq!(output, "User: Assistant: Hi there!\nUser: Goodbye!\n");
    assert_eq!(committed, 2);
}

#[tokio::test]
async fn test_blank_lines_are_skipped() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_text("Hello!"));

    let (exit, output, committed) = run_repl(
        provider.clone(),
        RenderStyle::Plain,
        "Hi\n\n   \nq\n",
    )
    .await;
    assert!(matches!(exit, ReplExit::Quit));
    assert_eq!(
        output,
        "User: Assistant: Hello!\nUser: User: User: Goodbye!\n"
    );
    assert_eq!(committed, 2);

    let requests = provider.received_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages, [ModelMessage::User("Hi".to_owned())]);
}

#[tokio::test]
async fn test_exit_keyword_skips_model() {
    for input in ["q\n", "EXIT\n", "  Quit  \n"] {
        let provider = TestModelProvider::default();
        let (exit, output, committed) =
            run_repl(provider.clone(), RenderStyle::Plain, input).await;
        assert!(matches!(exit, ReplExit::Quit));
        assert_eq!(output, "User: Goodbye!\n");
        assert_eq!(committed, 0);
        assert!(provider.received_requests().is_empty());
    }
}

#[tokio::test]
async fn test_tool_round_trip() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_events([
        search_call(),
    ]));
    provider.add_tool_result_step();
    provider.add_assistant_response_step(PresetResponse::with_text(
        "It is sunny today.",
    ));

    let (exit, output, committed) = run_repl(
        provider.clone(),
        RenderStyle::Plain,
        "What is the weather?\nexit\n",
    )
    .await;
    assert!(matches!(exit, ReplExit::Quit));
    assert_eq!(
        output,
        "User: Tool: tavily_search (query: weather today)\n\
         Assistant: It is sunny today.\n\
         User: Goodbye!\n"
    );
    assert_eq!(committed, 4);

    let requests = provider.received_requests();
    assert_eq!(requests.len(), 2);
    let ModelMessage::Tool(result) = &requests[1].messages[2] else {
        panic!("expected a tool result, got {:?}", requests[1].messages[2]);
    };
    let payload: serde_json::Value =
        serde_json::from_str(&result.content).unwrap();
    assert_eq!(payload["query"], "weather today");
    assert_eq!(payload["results"][0]["title"], "Forecast");
}

#[tokio::test]
async fn test_end_of_input_runs_fallback() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_text(
        "LangGraph is a library for building agents.",
    ));

    let (exit, output, committed) =
        run_repl(provider.clone(), RenderStyle::Plain, "").await;
    assert!(matches!(exit, ReplExit::InputExhausted));
    assert_eq!(exit.exit_code(), 0);
    assert_eq!(
        output,
        format!(
            "User: \nUser: {FALLBACK_QUESTION}\n\
             Assistant: LangGraph is a library for building agents.\n"
        )
    );
    assert_eq!(committed, 2);
    assert_eq!(
        provider.received_requests()[0].messages,
        [ModelMessage::User(FALLBACK_QUESTION.to_owned())]
    );
}

#[tokio::test]
async fn test_error_runs_fallback_once() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(
        PresetResponse::with_text("Here is what I know.").with_failures(1),
    );

    let (exit, output, committed) = run_repl(
        provider.clone(),
        RenderStyle::Plain,
        "Hello\nnever read\n",
    )
    .await;

    let ReplExit::Failed(err) = &exit else {
        panic!("expected a failure, got {exit:?}");
    };
    assert_eq!(err.kind(), ErrorKind::Model(ModelErrorKind::RateLimitExceeded));
    assert_eq!(exit.exit_code(), 1);

    let lines: Vec<_> = output.lines().collect();
    assert!(lines[0].starts_with("User: Error: "));
    assert_eq!(lines[1], format!("User: {FALLBACK_QUESTION}"));
    assert_eq!(lines[2], "Assistant: Here is what I know.");
    assert_eq!(lines.len(), 3);
    assert_eq!(committed, 2);
    assert_eq!(provider.received_requests().len(), 2);
}

#[tokio::test]
async fn test_failed_fallback_is_not_retried() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(
        PresetResponse::with_text("never").with_failures(0),
    );

    let (exit, output, committed) =
        run_repl(provider.clone(), RenderStyle::Plain, "Hello\n").await;
    assert!(matches!(exit, ReplExit::Failed(_)));
    assert_eq!(output.matches("Error: ").count(), 2);
    assert_eq!(committed, 0);
    assert_eq!(provider.received_requests().len(), 2);
}

#[tokio::test]
async fn test_search_failure_is_an_error() {
    struct BrokenSearch;

    impl SearchBackend for BrokenSearch {
        fn search(
            &self,
            _query: &str,
            _max_results: u32,
        ) -> impl Future<Output = Result<SearchResponse, SearchError>> + Send + 'static + use<>
        {
            ready(Err(SearchError::Service {
                status: 500,
                message: "internal error".to_owned(),
            }))
        }
    }

    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_events([
        search_call(),
    ]));

    let session = SessionBuilder::with_model_provider(provider)
        .with_web_search(WebSearchTool::new(BrokenSearch))
        .build();
    let mut output = vec![];
    let mut repl = Repl::new(
        session,
        "Weather?\n".as_bytes(),
        &mut output,
        Renderer::new(RenderStyle::Plain),
    );
    let exit = repl.run().await.unwrap();
    drop(repl);

    let ReplExit::Failed(err) = exit else {
        panic!("expected a failure");
    };
    assert!(matches!(err.kind(), ErrorKind::Tool(_)));
    assert!(String::from_utf8(output).unwrap().contains("internal error"));
}

#[tokio::test]
async fn test_banner_style() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_text("Hi!"));

    let (_, output, _) =
        run_repl(provider, RenderStyle::Banner, "Hello\nq\n").await;
    assert!(output.contains(" Human Message "));
    assert!(output.contains("\n\nHello\n"));
    assert!(output.contains(" AI Message "));
    assert!(output.contains("\n\nHi!\n"));
    assert!(output.ends_with("User: Goodbye!\n"));
}

#[tokio::test]
async fn test_resume_from_checkpoint() {
    let dir = tempfile::tempdir().unwrap();

    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_text("Hi!"));
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_text(
        "You said hello.",
    ));

    let session = SessionBuilder::with_model_provider(provider.clone())
        .with_session_id("thread-7")
        .with_checkpoint_store(FileCheckpointStore::new(dir.path()))
        .build();
    let mut output = vec![];
    let mut repl = Repl::new(
        session,
        "Hello\nq\n".as_bytes(),
        &mut output,
        Renderer::new(RenderStyle::Plain),
    );
    assert!(matches!(repl.run().await.unwrap(), ReplExit::Quit));
    drop(repl);

    let saved = FileCheckpointStore::new(dir.path())
        .load("thread-7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.len(), 2);

    let mut session = SessionBuilder::with_model_provider(provider)
        .with_session_id("thread-7")
        .with_checkpoint_store(FileCheckpointStore::new(dir.path()))
        .build();
    assert!(session.restore().await.unwrap());
    let answer = session
        .send_message("What did I say?", |_| {
            Ok::<_, std::convert::Infallible>(())
        })
        .await
        .unwrap();
    assert_eq!(answer, "You said hello.");
    assert_eq!(session.conversation().len(), 4);
}
