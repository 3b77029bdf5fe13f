use reqwest::Client;
use schemars::{JsonSchema, schema_for};
use scout_core::tool::{Error as ToolError, Tool, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The number of results a search returns unless configured otherwise.
pub const DEFAULT_MAX_RESULTS: u32 = 5;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// A single hit of a web search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the page.
    pub title: String,
    /// Address of the page.
    pub url: String,
    /// The relevant excerpt of the page.
    pub content: String,
    /// Relevance score given by the search engine.
    #[serde(default)]
    pub score: f64,
}

/// The outcome of a web search, which is also the payload of the tool
/// result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query that was searched.
    pub query: String,
    /// Hits in the order the search engine ranked them.
    pub results: Vec<SearchResult>,
}

/// An error from the search backend.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request could not be sent, or the response could not be read.
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The search service answered with an error.
    #[error("search service returned {status}: {message}")]
    Service {
        /// HTTP status code of the response.
        status: u16,
        /// Body of the response.
        message: String,
    },
}

/// A search engine that the web search tool queries.
pub trait SearchBackend: Send + Sync + 'static {
    /// Searches the web for `query`.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> impl Future<Output = Result<SearchResponse, SearchError>> + Send + 'static + use<Self>;
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// A client of the Tavily search API.
#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl TavilyClient {
    /// Creates a client with the given API key.
    #[inline]
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: TAVILY_ENDPOINT.to_owned(),
        }
    }

    /// Sends requests to `endpoint` instead of the public API.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sends requests through `client` instead of a default one.
    #[inline]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

impl SearchBackend for TavilyClient {
    fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> impl Future<Output = Result<SearchResponse, SearchError>> + Send + 'static + use<>
    {
        let resp_fut = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&TavilyRequest { query, max_results })
            .send();
        let query = query.to_owned();

        async move {
            let resp = resp_fut.await?;
            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                debug!("search failed with {status}: {message}");
                return Err(SearchError::Service {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: TavilyResponse = resp.json().await?;
            trace!("got {} results for {query:?}", body.results.len());
            Ok(SearchResponse {
                query,
                results: body.results,
            })
        }
    }
}

/// Input of [`WebSearchTool`].
#[derive(Deserialize, JsonSchema)]
pub struct WebSearchParameters {
    #[schemars(description = "The search query.")]
    query: String,
}

/// A tool for searching the web.
pub struct WebSearchTool<B> {
    backend: B,
    max_results: u32,
    parameter_schema: Value,
}

impl<B: SearchBackend> WebSearchTool<B> {
    /// Creates a new web search tool that queries `backend`.
    #[inline]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_results: DEFAULT_MAX_RESULTS,
            parameter_schema: schema_for!(WebSearchParameters).to_value(),
        }
    }

    /// Sets how many results a search returns.
    #[inline]
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

impl<B: SearchBackend> Tool for WebSearchTool<B> {
    type Input = WebSearchParameters;

    fn name(&self) -> &str {
        "tavily_search"
    }

    fn description(&self) -> &str {
        r#"
Search the web for up-to-date information.
Returns the most relevant pages with their title, URL and an excerpt."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WebSearchParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search_fut = self.backend.search(&input.query, self.max_results);
        async move {
            let resp = search_fut.await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })?;
            serde_json::to_string(&resp).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use scout_core::tool::ErrorKind as ToolErrorKind;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Answers exactly one HTTP request with a canned JSON response, and
    /// hands back the raw request it received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![];
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                // The request body is a single JSON object.
                if buf.ends_with(b"}") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8(buf).unwrap()
        });
        (format!("http://{addr}/search"), handle)
    }

    fn tavily_client(endpoint: String) -> TavilyClient {
        let client = Client::builder().no_proxy().build().unwrap();
        TavilyClient::new("tvly-test")
            .with_endpoint(endpoint)
            .with_client(client)
    }

    struct StubBackend;

    impl SearchBackend for StubBackend {
        fn search(
            &self,
            query: &str,
            max_results: u32,
        ) -> impl Future<Output = Result<SearchResponse, SearchError>> + Send + 'static + use<>
        {
            let resp = if query.is_empty() {
                Err(SearchError::Service {
                    status: 400,
                    message: "query is empty".to_owned(),
                })
            } else {
                Ok(SearchResponse {
                    query: query.to_owned(),
                    results: (0..max_results)
                        .map(|idx| SearchResult {
                            title: format!("Result {idx}"),
                            url: format!("https://example.com/{idx}"),
                            content: "...".to_owned(),
                            score: 0.5,
                        })
                        .collect(),
                })
            };
            ready(resp)
        }
    }

    #[test]
    fn test_definition() {
        let tool = WebSearchTool::new(StubBackend);
        assert_eq!(tool.name(), "tavily_search");
        let schema = tool.parameter_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_execute() {
        let tool = WebSearchTool::new(StubBackend).with_max_results(2);
        let content = tool
            .execute(WebSearchParameters {
                query: "weather today".to_owned(),
            })
            .await
            .unwrap();

        let content: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(content["query"], "weather today");
        assert_eq!(content["results"].as_array().unwrap().len(), 2);
        assert_eq!(content["results"][1]["url"], "https://example.com/1");
    }

    #[tokio::test]
    async fn test_execute_error() {
        let tool = WebSearchTool::new(StubBackend);
        let err = tool
            .execute(WebSearchParameters {
                query: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::ExecutionError);
        assert!(err.reason().contains("query is empty"));
    }

    #[test]
    fn test_tavily_payloads() {
        let req = TavilyRequest {
            query: "rust",
            max_results: 5,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "query": "rust", "max_results": 5 })
        );

        let resp: TavilyResponse = serde_json::from_value(json!({
            "query": "rust",
            "answer": null,
            "response_time": 1.2,
            "results": [{
                "title": "Rust",
                "url": "https://www.rust-lang.org/",
                "content": "A language empowering everyone.",
                "score": 0.98,
                "raw_content": null
            }]
        }))
        .unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].title, "Rust");
    }

    #[tokio::test]
    async fn test_tavily_search() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"query":"rust","results":[{"title":"Rust","url":"https://www.rust-lang.org/","content":"A language empowering everyone.","score":0.98}]}"#,
        )
        .await;
        let resp = tavily_client(endpoint).search("rust", 3).await.unwrap();
        assert_eq!(resp.query, "rust");
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].url, "https://www.rust-lang.org/");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /search "), "{request}");
        assert!(
            request
                .to_ascii_lowercase()
                .contains("authorization: bearer tvly-test")
        );
        assert!(request.ends_with(r#"{"query":"rust","max_results":3}"#));
    }

    #[tokio::test]
    async fn test_tavily_service_error() {
        let (endpoint, server) =
            serve_once("401 Unauthorized", r#"{"detail":"invalid api key"}"#)
                .await;
        let err = tavily_client(endpoint).search("rust", 3).await.unwrap_err();
        let SearchError::Service { status, message } = err else {
            panic!("expected a service error");
        };
        assert_eq!(status, 401);
        assert!(message.contains("invalid api key"));
        server.await.unwrap();
    }
}
