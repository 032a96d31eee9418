use api_client::{
    error::{self, Error},
    model::{Book, ListQuery, PagedResult},
    BookApi, MutationCache,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, PoisonError,
};

pub trait BookGridPresenter {
    fn loading(&mut self, _query: &ListQuery) {}

    fn render(&mut self, query: &ListQuery, page: &PagedResult<Book>);

    fn failed(&mut self, query: &ListQuery, error: &Error);
}

pub struct BookListView<C> {
    cache: MutationCache<C>,
    latest: AtomicU64,
    visible: Mutex<Option<(ListQuery, PagedResult<Book>)>>,
}

impl<C> BookListView<C>
where
    C: BookApi,
{
    pub fn new(cache: MutationCache<C>) -> Self {
        Self {
            cache,
            latest: AtomicU64::new(0),
            visible: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &MutationCache<C> {
        &self.cache
    }

    // Fetches `query`. Returns `Ok(None)` when another load was issued while
    // this one was in flight; its outcome is then dropped, errors included.
    pub async fn load(&self, query: ListQuery) -> error::Result<Option<PagedResult<Book>>> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.cache.list(&query).await;

        if self.latest.load(Ordering::SeqCst) != ticket {
            tracing::debug!(key = %query.cache_key(), "discarding superseded listing");
            return Ok(None);
        }

        let page = outcome?;
        *self
            .visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((query, page.clone()));

        Ok(Some(page))
    }

    pub fn visible(&self) -> Option<(ListQuery, PagedResult<Book>)> {
        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn present<P>(&self, query: ListQuery, presenter: &mut P)
    where
        P: BookGridPresenter,
    {
        presenter.loading(&query);
        match self.load(query.clone()).await {
            Ok(Some(page)) => presenter.render(&query, &page),
            Ok(None) => (),
            Err(error) => presenter.failed(&query, &error),
        }
    }
}
