//! Parsed expression cache

use crate::ast::Expr;
use crate::error::CalcResult;
use ahash::AHashMap;
use std::sync::{Arc, RwLock};

/// Maps exact source text to its parsed (and optimized) tree
///
/// There is no eviction; the cache lives as long as its engine or until it is
/// cleared.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: RwLock<AHashMap<String, Arc<Expr>>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached tree for `text`, parsing and inserting it on a miss
    pub fn get_or_parse<F>(&self, text: &str, parse: F) -> CalcResult<Arc<Expr>>
    where
        F: FnOnce(&str) -> CalcResult<Expr>,
    {
        if let Some(expr) = self.get(text) {
            log::debug!("expression served from cache: {}", text);
            return Ok(expr);
        }

        let expr = Arc::new(parse(text)?);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(text.to_string(), Arc::clone(&expr));
        }
        Ok(expr)
    }

    pub fn get(&self, text: &str) -> Option<Arc<Expr>> {
        self.entries.read().ok()?.get(text).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}
