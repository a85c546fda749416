use axum::http::{HeaderMap, Method, Uri};
use std::fmt;
use std::sync::Arc;

use crate::error::BindResult;
use crate::logic::resolver::fetch_first;
use crate::model::bindable::{decode_record, BindableModel};
use crate::store::{LookupQuery, ModelStore};

/// The request-scoped context handed to custom finders and handlers.
#[derive(Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    route: Arc<str>,
    store: Arc<dyn ModelStore>,
}

impl RequestContext {
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        route: &str,
        store: Arc<dyn ModelStore>,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            route: Arc::from(route),
            store,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The route pattern as declared, annotations included
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn store(&self) -> &dyn ModelStore {
        self.store.as_ref()
    }

    /// Load the first `T` whose `column` equals `value`
    pub async fn find_by<T: BindableModel>(&self, column: &str, value: &str) -> BindResult<T> {
        self.find_with::<T>(LookupQuery::by_key(T::TABLE, column, value))
            .await
    }

    /// Load the first `T` matching an arbitrary lookup, `NotFound` when none does
    pub async fn find_with<T: BindableModel>(&self, query: LookupQuery) -> BindResult<T> {
        let record = fetch_first(self.store(), query, T::NAME).await?;
        decode_record(T::NAME, &record)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}
