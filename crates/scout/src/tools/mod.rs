//! Tools that models can use.

mod web_search;

pub use web_search::{
    DEFAULT_MAX_RESULTS, SearchBackend, SearchError, SearchResponse,
    SearchResult, TavilyClient, WebSearchParameters, WebSearchTool,
};
