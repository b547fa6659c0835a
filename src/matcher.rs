//! Ordered duplicate-match strategy chain.
//!
//! Strategies are tried in precision order and the chain short-circuits on
//! the first non-empty result: exact title (near-zero false positives), then
//! the supplied identifier (precise and cheap when present), then domain
//! keywords (broadest net, highest false-positive risk, so it runs last).
//! Each strategy consults the query cache before going to the tracker
//! through the retry executor.

use anyhow::Result;

use crate::cache::QueryCache;
use crate::config::Config;
use crate::gh::{IssueSummary, Tracker, SEARCH_FIELDS};
use crate::keywords;
use crate::retry::RetryExecutor;

/// One remote search, immutable, built per match attempt.
#[derive(Debug, Clone)]
pub struct Query {
    pub repository: String,
    pub search_text: String,
    pub fields: &'static [&'static str],
}

/// A candidate report to check against existing issues.
#[derive(Debug, Clone, Copy)]
pub struct MatchRequest<'a> {
    pub repository: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub identifier: Option<&'a str>,
}

/// The first issue surfaced by the chain, with the strategy that found it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub issue: IssueSummary,
    pub strategy: &'static str,
}

trait MatchStrategy {
    fn name(&self) -> &'static str;

    /// The search this strategy would run, or `None` when it does not apply
    /// to the request.
    fn query(&self, request: &MatchRequest) -> Option<Query>;
}

struct ExactTitle;

impl MatchStrategy for ExactTitle {
    fn name(&self) -> &'static str {
        "exact-title"
    }

    fn query(&self, request: &MatchRequest) -> Option<Query> {
        Some(Query {
            repository: request.repository.to_string(),
            search_text: format!("\"{}\" in:title", request.title),
            fields: SEARCH_FIELDS,
        })
    }
}

struct Identifier;

impl MatchStrategy for Identifier {
    fn name(&self) -> &'static str {
        "identifier"
    }

    fn query(&self, request: &MatchRequest) -> Option<Query> {
        // Matched in title or body, the tracker's default scope
        request.identifier.map(|id| Query {
            repository: request.repository.to_string(),
            search_text: id.to_string(),
            fields: SEARCH_FIELDS,
        })
    }
}

struct Keyword {
    limit: usize,
}

impl MatchStrategy for Keyword {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn query(&self, request: &MatchRequest) -> Option<Query> {
        let terms = keywords::extract(request.title, request.body, self.limit);
        if terms.is_empty() {
            return None;
        }
        Some(Query {
            repository: request.repository.to_string(),
            search_text: terms.join(" "),
            fields: SEARCH_FIELDS,
        })
    }
}

/// Runs the strategy chain against a tracker.
pub struct DuplicateMatcher<'a> {
    cache: &'a QueryCache,
    retry: &'a RetryExecutor,
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl<'a> DuplicateMatcher<'a> {
    pub fn new(config: &Config, cache: &'a QueryCache, retry: &'a RetryExecutor) -> Self {
        Self {
            cache,
            retry,
            strategies: vec![
                Box::new(ExactTitle),
                Box::new(Identifier),
                Box::new(Keyword {
                    limit: config.keyword_limit,
                }),
            ],
        }
    }

    /// Find an existing open issue equivalent to the request, if any.
    ///
    /// Remote failures propagate (after retry exhaustion); an inapplicable
    /// strategy is simply skipped.
    pub fn find_duplicate(
        &self,
        tracker: &dyn Tracker,
        request: &MatchRequest,
    ) -> Result<Option<Candidate>> {
        for strategy in &self.strategies {
            let Some(query) = strategy.query(request) else {
                tracing::debug!("Strategy {} not applicable, skipping", strategy.name());
                continue;
            };

            let results = match self.cache.get(&query.repository, &query.search_text) {
                Some(cached) => cached,
                None => {
                    let operation = format!("issue search ({})", strategy.name());
                    let fresh = self.retry.execute(&operation, || {
                        tracker.search_issues(&query.repository, &query.search_text, query.fields)
                    })?;
                    self.cache.put(&query.repository, &query.search_text, &fresh);
                    fresh
                }
            };

            if let Some(first) = results.first() {
                tracing::debug!(
                    "Strategy {} matched issue #{}",
                    strategy.name(),
                    first.number
                );
                return Ok(Some(Candidate {
                    issue: first.clone(),
                    strategy: strategy.name(),
                }));
            }
        }

        Ok(None)
    }
}
