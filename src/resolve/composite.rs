//! Ordered resolver chains

use super::{NullResolver, ResolveResult, ResourceDocumentResolver};
use std::sync::Arc;

/// Resolver that delegates to an ordered list of resolvers.
///
/// The first resolver returning a document wins. There is no fail over: a
/// resolver error ends the lookup, a resolver must return `Ok(None)` to let the
/// next one try.
pub struct CompositeResolver {
    resolvers: Vec<Arc<dyn ResourceDocumentResolver>>,
}

impl CompositeResolver {
    pub fn new(resolvers: Vec<Arc<dyn ResourceDocumentResolver>>) -> Self {
        Self { resolvers }
    }

    fn first_match<F>(&self, query: F) -> ResolveResult
    where
        F: Fn(&dyn ResourceDocumentResolver) -> ResolveResult,
    {
        for resolver in &self.resolvers {
            if let Some(document) = query(resolver.as_ref())? {
                return Ok(Some(document));
            }
        }
        Ok(None)
    }
}

impl ResourceDocumentResolver for CompositeResolver {
    fn resolve_by_uri(&self, uri: &str) -> ResolveResult {
        self.first_match(|r| r.resolve_by_uri(uri))
    }

    fn resolve_by_public_id(&self, uri: Option<&str>, public_id: &str) -> ResolveResult {
        self.first_match(|r| r.resolve_by_public_id(uri, public_id))
    }

    fn resolve_by_target_namespace(
        &self,
        uri: Option<&str>,
        target_namespace: Option<&str>,
    ) -> ResolveResult {
        self.first_match(|r| r.resolve_by_target_namespace(uri, target_namespace))
    }
}

/// Build a single resolver from a list.
///
/// No resolvers gives a [`NullResolver`], a single resolver is returned as is
/// and anything else is wrapped in a [`CompositeResolver`].
pub fn compose(
    mut resolvers: Vec<Arc<dyn ResourceDocumentResolver>>,
) -> Arc<dyn ResourceDocumentResolver> {
    match resolvers.len() {
        0 => Arc::new(NullResolver),
        1 => resolvers.remove(0),
        _ => Arc::new(CompositeResolver::new(resolvers)),
    }
}
