//! The loader contract and its failure boundary.

use std::future::Future;
use std::marker::PhantomData;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tabula_model::Page;
use tabula_query::QueryState;

use crate::decode::decode_page;
use crate::error::LoaderError;

pub type LoadFuture<R> = BoxFuture<'static, Result<Page<R>, LoaderError>>;

/// Fetches one page for a query.
///
/// Implementations must depend only on the query they are given, so that
/// retrying or discarding a result is always safe.
pub trait Loader<R>: Send + Sync {
    fn load(&self, query: &QueryState) -> LoadFuture<R>;
}

impl<R, F, Fut> Loader<R> for F
where
    F: Fn(QueryState) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Page<R>, LoaderError>> + Send + 'static,
{
    fn load(&self, query: &QueryState) -> LoadFuture<R> {
        self(query.clone()).boxed()
    }
}

/// Loader for endpoints that answer with raw JSON.
///
/// The body goes through [`decode_page`], so odd shapes degrade instead of
/// failing.
pub struct JsonLoader<F, R> {
    fetch: F,
    _rows: PhantomData<fn() -> R>,
}

impl<F, R> JsonLoader<F, R> {
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            _rows: PhantomData,
        }
    }
}

impl<F, Fut, R> Loader<R> for JsonLoader<F, R>
where
    F: Fn(QueryState) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, LoaderError>> + Send + 'static,
    R: DeserializeOwned + Send + 'static,
{
    fn load(&self, query: &QueryState) -> LoadFuture<R> {
        let fallback = query.clone();
        (self.fetch)(query.clone())
            .map(move |body| decode_page(body?, &fallback))
            .boxed()
    }
}

/// Failure boundary around a [`Loader`].
///
/// [`SafeLoader::load`] never fails: an error becomes
/// `{rows: [], page: query.page, limit: query.limit, total: 0, totalPages: 0}`
/// and a warning in the log.
pub struct SafeLoader<L> {
    inner: L,
}

impl<L> SafeLoader<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Loads without the boundary, for callers that treat failures
    /// differently (e.g. do not cache them).
    pub fn try_load<R>(&self, query: &QueryState) -> LoadFuture<R>
    where
        L: Loader<R>,
    {
        self.inner.load(query)
    }

    pub async fn load<R>(&self, query: &QueryState) -> Page<R>
    where
        L: Loader<R>,
    {
        match self.inner.load(query).await {
            Ok(mut page) => {
                page.recompute_total_pages();
                page
            }
            Err(error) => empty_page_for(query, &error),
        }
    }
}

/// Logs a failed fetch and returns the empty page that stands in for it.
pub(crate) fn empty_page_for<R>(query: &QueryState, error: &LoaderError) -> Page<R> {
    tracing::warn!(
        %error,
        page = query.page,
        limit = query.limit,
        search = %query.search,
        "loader failed, showing an empty page"
    );
    Page::empty(query.page, query.limit)
}
