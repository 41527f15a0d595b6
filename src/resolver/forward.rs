//! Model forwarding: transparent substitution of one model for another.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::cache::CacheCoordinator;
use crate::telemetry;
use crate::types::{ForwardRule, Model};
use crate::{HuginnError, Result};

/// Hop limit used when none is configured.
pub const DEFAULT_MAX_HOPS: usize = 8;

/// Distinct keyword patterns kept compiled.
const MAX_COMPILED_PATTERNS: u64 = 1024;

/// Follows forwarding rules from a resolved model to the one to invoke.
pub struct ForwardResolver {
    cache: Arc<CacheCoordinator>,
    keywords: KeywordMatcher,
    max_hops: usize,
}

impl ForwardResolver {
    pub fn new(cache: Arc<CacheCoordinator>) -> Self {
        Self {
            cache,
            keywords: KeywordMatcher::new(),
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Set the maximum number of forwarding hops.
    pub fn max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Follow `model`'s forwarding chain for `prompt`.
    ///
    /// A chain stops at the first model that does not forward, or whose
    /// target is missing, inactive, or unmatched by the prompt; that model is
    /// returned. Revisiting a model or exceeding the hop limit fails with
    /// [`HuginnError::ForwardingCycle`].
    #[instrument(skip(self, model, prompt), fields(model_id = %model.id), level = "debug")]
    pub async fn resolve_target(&self, model: Model, prompt: &str) -> Result<Model> {
        let mut visited = HashSet::from([model.id.clone()]);
        let mut current = model;
        let mut hops = 0;

        loop {
            let Some(target_id) = self.next_hop(&current, prompt) else {
                return Ok(current);
            };

            let target = match self.cache.get_one(&target_id).await {
                Ok(target) if target.status.is_active() => target,
                Ok(target) => {
                    debug!(from = %current.id, to = %target.id, status = target.status.code(), "forward target inactive");
                    return Ok(current);
                }
                Err(e) => {
                    debug!(from = %current.id, to = %target_id, error = %e, "forward target unavailable");
                    return Ok(current);
                }
            };

            hops += 1;
            if hops > self.max_hops || !visited.insert(target.id.clone()) {
                warn!(model = %target.id, hops, "forwarding cycle detected");
                return Err(HuginnError::ForwardingCycle {
                    model: target.id,
                    hops,
                });
            }

            metrics::counter!(telemetry::FORWARD_HOPS_TOTAL).increment(1);
            debug!(from = %current.id, to = %target.id, hops, "forwarding model");
            current = target;
        }
    }

    /// Target id `model` forwards to for `prompt`, if any.
    fn next_hop(&self, model: &Model, prompt: &str) -> Option<String> {
        if !model.is_forward {
            return None;
        }
        let config = model.forward_config.as_ref()?;
        let target = match config.forward_rule {
            ForwardRule::Static => Some(config.target_model.clone()),
            ForwardRule::Keyword => {
                let index = self.keywords.last_match(&config.keywords, prompt)?;
                match config.target_models.get(index) {
                    Some(target) => Some(target.clone()),
                    None => {
                        warn!(model = %model.id, index, "keyword has no matching target model");
                        None
                    }
                }
            }
        };
        target.filter(|t| !t.is_empty())
    }
}

/// Matches prompts against forwarding keywords.
///
/// Keywords are regular expressions. Both sides are lowercased and stripped
/// of whitespace before matching. A keyword that is not a valid expression
/// never matches. Compiled patterns, including failed ones, are cached by
/// their normalized text.
#[derive(Clone)]
pub struct KeywordMatcher {
    patterns: moka::sync::Cache<String, Option<Regex>>,
}

impl KeywordMatcher {
    pub fn new() -> Self {
        Self {
            patterns: moka::sync::Cache::new(MAX_COMPILED_PATTERNS),
        }
    }

    /// Index of the last keyword that matches `prompt`.
    pub fn last_match(&self, keywords: &[String], prompt: &str) -> Option<usize> {
        let prompt = normalize(prompt);
        keywords
            .iter()
            .enumerate()
            .filter(|(_, keyword)| {
                self.compiled(keyword)
                    .is_some_and(|re| re.is_match(&prompt))
            })
            .map(|(i, _)| i)
            .last()
    }

    fn compiled(&self, keyword: &str) -> Option<Regex> {
        let pattern = normalize(keyword);
        self.patterns
            .get_with_by_ref(&pattern, || match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "invalid forward keyword");
                    None
                }
            })
    }

    /// Whether `keyword` has been compiled and cached.
    pub fn is_cached(&self, keyword: &str) -> bool {
        self.patterns.contains_key(&normalize(keyword))
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
