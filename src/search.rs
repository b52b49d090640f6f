//! Prefix search over the published index

use std::sync::Arc;

use crate::{
    constants::DEFAULT_SEARCH_LIMIT,
    error::SearchError,
    index::IndexHandle,
    types::SearchResponse,
};

/// Validated prefix search against the current index generation
///
/// Holds only the generation handle; matching itself lives in the trie.
/// Searches read whichever generation is published and are never blocked by
/// an in-progress rebuild.
pub struct SearchService {
    handle: Arc<IndexHandle>,
}

impl SearchService {
    pub fn new(handle: Arc<IndexHandle>) -> Self {
        Self { handle }
    }

    /// Searches with the default result limit
    ///
    /// An empty or whitespace-only query is a caller error; a query that
    /// matches nothing is a normal empty response.
    pub async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        self.search_with_limit(query, DEFAULT_SEARCH_LIMIT).await
    }

    pub async fn search_with_limit(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<SearchResponse, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let index = self.handle.current().await;
        let results = index.search(query, limit);
        Ok(SearchResponse {
            count: results.len(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::PrefixIndex;
    use crate::types::fixtures::summary;

    async fn service_with_bitcoin() -> SearchService {
        let mut index = PrefixIndex::new();
        let bitcoin = summary("bitcoin", "Bitcoin", "btc");
        index.insert("Bitcoin", bitcoin.clone());
        index.insert("BTC", bitcoin);

        let handle = Arc::new(IndexHandle::new());
        handle.publish(index).await;
        SearchService::new(handle)
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let service = service_with_bitcoin().await;
        assert_eq!(service.search("").await, Err(SearchError::EmptyQuery));
        assert_eq!(service.search("   ").await, Err(SearchError::EmptyQuery));
    }

    #[tokio::test]
    async fn query_is_trimmed_before_matching() {
        let service = service_with_bitcoin().await;
        let response = service.search("  bit  ").await.unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].id, "bitcoin");
    }

    #[tokio::test]
    async fn no_match_is_an_empty_response_not_an_error() {
        let service = service_with_bitcoin().await;
        let response = service.search("xyz").await.unwrap();
        assert_eq!(response.count, 0);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn count_matches_results_length() {
        let service = service_with_bitcoin().await;
        let response = service.search("b").await.unwrap();
        assert_eq!(response.count, response.results.len());
        assert_eq!(response.count, 2);
    }
}
