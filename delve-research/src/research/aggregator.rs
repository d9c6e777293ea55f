//! Research aggregation: planned queries to one session corpus

use super::corpus::CorpusBuilder;
use super::planner::{subtopic_queries, QueryPlanner};
use crate::sources::{ContentFetcher, SearchProvider};
use delve_core::{
    FetchedDocument, ResearchQuery, ResearchSettings, SearchResult, Subtopic, Throttle,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// URL the search adapter substitutes for hits without a link
const PLACEHOLDER_URL: &str = "#";

/// Per-question research state
///
/// Owned by a single request. The corpus is built at most once.
#[derive(Debug)]
pub struct ResearchSession {
    pub id: String,
    question: String,
    corpus: Option<String>,
    visited: HashMap<String, FetchedDocument>,
    queries: Vec<ResearchQuery>,
    subtopics: Vec<Subtopic>,
}

impl ResearchSession {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            corpus: None,
            visited: HashMap::new(),
            queries: Vec::new(),
            subtopics: Vec::new(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn corpus(&self) -> Option<&str> {
        self.corpus.as_deref()
    }

    /// Queries the corpus was built from, main queries first
    pub fn queries(&self) -> &[ResearchQuery] {
        &self.queries
    }

    pub fn subtopics(&self) -> &[Subtopic] {
        &self.subtopics
    }

    pub fn visited_urls(&self) -> usize {
        self.visited.len()
    }
}

/// Orchestrates search and fetch across every planned query
pub struct ResearchAggregator {
    planner: Arc<QueryPlanner>,
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn ContentFetcher>,
    settings: ResearchSettings,
    max_results: usize,
}

impl ResearchAggregator {
    pub fn new(
        planner: Arc<QueryPlanner>,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn ContentFetcher>,
        settings: &ResearchSettings,
        max_results: usize,
    ) -> Self {
        Self {
            planner,
            search,
            fetcher,
            settings: settings.clone(),
            max_results,
        }
    }

    /// Build the session corpus; later calls return the memoized text
    pub async fn build_corpus(&self, session: &mut ResearchSession) -> String {
        if let Some(corpus) = &session.corpus {
            debug!(session_id = %session.id, "Reusing memoized corpus");
            return corpus.clone();
        }

        info!(session_id = %session.id, "Building research corpus for: {}", session.question);

        let throttle = Throttle::new(self.settings.fetch_delay_ms);
        let mut builder = CorpusBuilder::new(&session.question);

        let queries = self.planner.plan(&session.question).await;
        for query in &queries {
            let results = self.gather(query, session, &throttle).await;
            builder.push_query(query, &results);
        }
        session.queries = queries;

        if self.settings.explore_subtopics {
            let subtopics = self.planner.plan_subtopics(&session.question).await;
            builder.push_subtopic_section();

            for subtopic in &subtopics {
                info!(session_id = %session.id, "Exploring subtopic: {}", subtopic.title);
                builder.push_subtopic_header(&subtopic.title);

                for query in subtopic_queries(std::slice::from_ref(subtopic)) {
                    let results = self.gather(&query, session, &throttle).await;
                    builder.push_query(&query, &results);
                    session.queries.push(query);
                }
            }
            session.subtopics = subtopics;
        }

        info!(
            session_id = %session.id,
            blocks = builder.query_block_count(),
            urls = session.visited.len(),
            "Corpus assembled"
        );

        let corpus = builder.finalize();
        session.corpus = Some(corpus.clone());
        corpus
    }

    /// Search one query and attach fetched content to every hit
    async fn gather(
        &self,
        query: &ResearchQuery,
        session: &mut ResearchSession,
        throttle: &Throttle,
    ) -> Vec<SearchResult> {
        debug!("Searching for: {}", query.text);
        let mut results = self.search.search(&query.text, self.max_results).await;

        for result in &mut results {
            let SearchResult::Hit(hit) = result else {
                continue;
            };
            if hit.url.is_empty() || hit.url == PLACEHOLDER_URL {
                continue;
            }

            if let Some(document) = session.visited.get(&hit.url) {
                debug!("Reusing fetched document for {}", hit.url);
                hit.document = Some(document.clone());
                continue;
            }

            throttle.wait().await;
            let document = self.fetcher.fetch(&hit.url).await;
            session.visited.insert(hit.url.clone(), document.clone());
            hit.document = Some(document);
        }

        results
    }
}
