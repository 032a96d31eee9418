use std::{
    collections::HashMap,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::{Mutex, RwLock};

use crate::{
    client::BookApi,
    error::{self, Error, ErrorKind},
    model::{Book, BookId, BookPatch, ListQuery, NewBook, PagedResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for Failure {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MutationState {
    #[default]
    Idle,
    Pending,
    Success,
    Error(Failure),
}

impl MutationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending)
    }
}

const CACHED_PAGES: usize = 32;

struct CachedPage {
    version: u64,
    stored: u64,
    page: PagedResult<Book>,
}

#[derive(Default)]
struct Tracked {
    ticket: u64,
    state: MutationState,
}

// List reads go through a cache keyed by the full query; a successful
// mutation bumps the namespace version so every cached page turns stale.
pub struct MutationCache<C> {
    client: C,
    version: AtomicU64,
    stored: AtomicU64,
    pages: RwLock<HashMap<String, CachedPage>>,
    mutations: Mutex<HashMap<MutationKind, Tracked>>,
}

impl<C> MutationCache<C>
where
    C: BookApi,
{
    pub fn new(client: C) -> Self {
        Self {
            client,
            version: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            pages: Default::default(),
            mutations: Default::default(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn invalidate(&self) {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(version, "book listings invalidated");
    }

    pub async fn list(&self, query: &ListQuery) -> error::Result<PagedResult<Book>> {
        let key = query.cache_key();
        // Read before fetching: a snapshot that races an invalidation is
        // returned but never stored.
        let version = self.version();

        if let Some(cached) = self.pages.read().await.get(&key) {
            if cached.version == version {
                tracing::trace!(%key, "serving cached listing");
                return Ok(cached.page.clone());
            }
        }

        let page = self.client.list(query).await?;

        let mut pages = self.pages.write().await;
        let current = self.version();
        pages.retain(|_, cached| cached.version == current);
        if version != current {
            tracing::debug!(%key, "listing went stale while fetching");
            return Ok(page);
        }

        if pages.len() >= CACHED_PAGES && !pages.contains_key(&key) {
            let oldest = pages
                .iter()
                .min_by_key(|(_, cached)| cached.stored)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                pages.remove(&oldest);
            }
        }
        pages.insert(
            key,
            CachedPage {
                version,
                stored: self.stored.fetch_add(1, Ordering::SeqCst),
                page: page.clone(),
            },
        );

        Ok(page)
    }

    pub async fn get(&self, id: &BookId) -> error::Result<Book> {
        self.client.get(id).await
    }

    pub async fn create(&self, fields: &NewBook) -> error::Result<Book> {
        self.track(MutationKind::Create, self.client.create(fields))
            .await
    }

    pub async fn update(&self, id: &BookId, fields: &BookPatch) -> error::Result<Book> {
        self.track(MutationKind::Update, self.client.update(id, fields))
            .await
    }

    pub async fn delete(&self, id: &BookId) -> error::Result<()> {
        self.track(MutationKind::Delete, async {
            match self.client.delete(id).await {
                Err(Error::NotFound(id)) => {
                    tracing::debug!(%id, "book was already deleted");
                    Ok(())
                }
                outcome => outcome,
            }
        })
        .await
    }

    pub async fn state(&self, kind: MutationKind) -> MutationState {
        self.mutations
            .lock()
            .await
            .get(&kind)
            .map(|tracked| tracked.state.clone())
            .unwrap_or_default()
    }

    pub async fn reset(&self, kind: MutationKind) {
        if let Some(tracked) = self.mutations.lock().await.get_mut(&kind) {
            tracked.state = MutationState::Idle;
        }
    }

    // Only the most recently started mutation of a kind owns its state.
    async fn track<A, F>(&self, kind: MutationKind, mutation: F) -> error::Result<A>
    where
        F: Future<Output = error::Result<A>>,
    {
        let ticket = {
            let mut mutations = self.mutations.lock().await;
            let tracked = mutations.entry(kind).or_default();
            tracked.ticket += 1;
            tracked.state = MutationState::Pending;
            tracked.ticket
        };

        let outcome = mutation.await;

        let state = match &outcome {
            Ok(_) => {
                self.invalidate();
                MutationState::Success
            }
            Err(error) => {
                tracing::warn!(?kind, %error, "mutation failed");
                MutationState::Error(error.into())
            }
        };

        let mut mutations = self.mutations.lock().await;
        if let Some(tracked) = mutations.get_mut(&kind) {
            if tracked.ticket == ticket {
                tracked.state = state;
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::atomic::AtomicUsize, time::Duration};
    use tokio::{sync::Mutex as AsyncMutex, time};

    #[derive(Default)]
    struct CountingApi {
        books: AsyncMutex<Vec<Book>>,
        list_calls: AtomicUsize,
        reject_writes: bool,
    }

    fn book(id: &str, title: &str) -> Book {
        Book {
            id: BookId::from(id),
            title: title.to_owned(),
            author: "Tere Liye".to_owned(),
            isbn: None,
            published_year: 2012,
            stock: 1,
            cover_image: None,
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    impl BookApi for CountingApi {
        async fn list(&self, query: &ListQuery) -> error::Result<PagedResult<Book>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let books = self.books.lock().await.clone();
            let total = books.len() as u64;
            Ok(PagedResult {
                items: books.into_iter().take(query.limit as usize).collect(),
                page: query.page,
                limit: query.limit,
                total,
                total_pages: PagedResult::<Book>::total_pages_for(total, query.limit),
            })
        }

        async fn get(&self, id: &BookId) -> error::Result<Book> {
            self.books
                .lock()
                .await
                .iter()
                .find(|book| &book.id == id)
                .cloned()
                .ok_or_else(|| Error::NotFound(id.clone()))
        }

        async fn create(&self, fields: &NewBook) -> error::Result<Book> {
            if self.reject_writes {
                return Err(Error::Validation("title must not be empty".to_owned()));
            }
            let mut books = self.books.lock().await;
            let created = book(&format!("b-{}", books.len() + 1), &fields.title);
            books.push(created.clone());
            Ok(created)
        }

        async fn update(&self, id: &BookId, fields: &BookPatch) -> error::Result<Book> {
            let mut books = self.books.lock().await;
            let book = books
                .iter_mut()
                .find(|book| &book.id == id)
                .ok_or_else(|| Error::NotFound(id.clone()))?;
            if let Some(title) = &fields.title {
                book.title = title.clone();
            }
            Ok(book.clone())
        }

        async fn delete(&self, id: &BookId) -> error::Result<()> {
            let mut books = self.books.lock().await;
            let before = books.len();
            books.retain(|book| &book.id != id);
            if books.len() == before {
                Err(Error::NotFound(id.clone()))
            } else {
                Ok(())
            }
        }
    }

    fn new_book(title: &str) -> NewBook {
        NewBook {
            title: title.to_owned(),
            author: "Tere Liye".to_owned(),
            isbn: None,
            published_year: 2012,
            stock: 1,
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn repeated_reads_are_served_from_cache() {
        let cache = MutationCache::new(CountingApi::default());
        let query = ListQuery::default();

        cache.list(&query).await.unwrap();
        cache.list(&query).await.unwrap();
        assert_eq!(cache.client().list_calls.load(Ordering::SeqCst), 1);

        let other = ListQuery {
            page: 2,
            ..query.clone()
        };
        cache.list(&other).await.unwrap();
        assert_eq!(cache.client().list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn successful_create_invalidates_every_listing() {
        let cache = MutationCache::new(CountingApi::default());
        let first = ListQuery::default();
        let second = ListQuery {
            search: Some("hujan".to_owned()),
            ..first.clone()
        };

        assert_eq!(cache.list(&first).await.unwrap().total, 0);
        cache.list(&second).await.unwrap();

        cache.create(&new_book("Hujan")).await.unwrap();
        assert_eq!(cache.state(MutationKind::Create).await, MutationState::Success);

        assert_eq!(cache.list(&first).await.unwrap().total, 1);
        cache.list(&second).await.unwrap();
        assert_eq!(cache.client().list_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failed_mutation_keeps_cache_and_records_error() {
        let cache = MutationCache::new(CountingApi {
            reject_writes: true,
            ..Default::default()
        });
        let query = ListQuery::default();
        cache.list(&query).await.unwrap();
        let version = cache.version();

        let error = cache.create(&new_book("")).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);

        let MutationState::Error(failure) = cache.state(MutationKind::Create).await else {
            panic!("expected an error state");
        };
        assert_eq!(failure.kind, ErrorKind::Validation);
        assert_eq!(cache.version(), version);

        cache.list(&query).await.unwrap();
        assert_eq!(cache.client().list_calls.load(Ordering::SeqCst), 1);

        cache.reset(MutationKind::Create).await;
        assert_eq!(cache.state(MutationKind::Create).await, MutationState::Idle);
    }

    #[tokio::test]
    async fn states_are_tracked_per_kind() {
        let cache = MutationCache::new(CountingApi::default());
        let created = cache.create(&new_book("Pulang")).await.unwrap();

        assert_eq!(cache.state(MutationKind::Update).await, MutationState::Idle);

        let patch = BookPatch {
            title: Some("Pergi".to_owned()),
            ..Default::default()
        };
        let updated = cache.update(&created.id, &patch).await.unwrap();
        assert_eq!(updated.title, "Pergi");
        assert_eq!(cache.state(MutationKind::Update).await, MutationState::Success);
        assert_eq!(cache.state(MutationKind::Delete).await, MutationState::Idle);
    }

    #[tokio::test]
    async fn deleting_twice_is_success_equivalent() {
        let cache = MutationCache::new(CountingApi::default());
        let created = cache.create(&new_book("Rindu")).await.unwrap();

        cache.delete(&created.id).await.unwrap();
        cache.delete(&created.id).await.unwrap();
        assert_eq!(cache.state(MutationKind::Delete).await, MutationState::Success);

        assert!(matches!(
            cache.get(&created.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn manual_invalidation_forces_refetch() {
        let cache = MutationCache::new(CountingApi::default());
        let query = ListQuery::default();
        cache.list(&query).await.unwrap();
        cache.invalidate();
        cache.list(&query).await.unwrap();
        assert_eq!(cache.client().list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn listings_are_capped_and_the_oldest_goes_first() {
        let cache = MutationCache::new(CountingApi::default());
        let page = |page| ListQuery {
            page,
            ..Default::default()
        };

        for n in 1..=CACHED_PAGES as u32 + 1 {
            cache.list(&page(n)).await.unwrap();
        }
        assert_eq!(cache.pages.read().await.len(), CACHED_PAGES);

        cache.list(&page(2)).await.unwrap();
        let calls = cache.client().list_calls.load(Ordering::SeqCst);
        cache.list(&page(1)).await.unwrap();
        assert_eq!(cache.client().list_calls.load(Ordering::SeqCst), calls + 1);
    }

    #[tokio::test]
    async fn invalidation_drops_stale_listings() {
        let cache = MutationCache::new(CountingApi::default());
        cache.list(&ListQuery::default()).await.unwrap();
        cache
            .list(&ListQuery {
                page: 2,
                ..Default::default()
            })
            .await
            .unwrap();

        cache.invalidate();
        cache.list(&ListQuery::default()).await.unwrap();
        assert_eq!(cache.pages.read().await.len(), 1);
    }

    #[derive(Default)]
    struct PacedApi {
        list_calls: AtomicUsize,
    }

    impl BookApi for PacedApi {
        async fn list(&self, query: &ListQuery) -> error::Result<PagedResult<Book>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(Duration::from_millis(100)).await;
            Ok(PagedResult {
                items: vec![],
                page: query.page,
                limit: query.limit,
                total: 0,
                total_pages: 0,
            })
        }

        async fn get(&self, id: &BookId) -> error::Result<Book> {
            Err(Error::NotFound(id.clone()))
        }

        async fn create(&self, fields: &NewBook) -> error::Result<Book> {
            if fields.title == "slow" {
                time::sleep(Duration::from_millis(300)).await;
                return Err(Error::Validation("isbn is not a valid ISBN-13".to_owned()));
            }
            time::sleep(Duration::from_millis(50)).await;
            Ok(book("b-1", &fields.title))
        }

        async fn update(&self, id: &BookId, _fields: &BookPatch) -> error::Result<Book> {
            Err(Error::NotFound(id.clone()))
        }

        async fn delete(&self, _id: &BookId) -> error::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_latest_mutation_of_a_kind_sets_the_state() {
        let cache = MutationCache::new(PacedApi::default());

        let slow_book = new_book("slow");
        let (slow, fast) = tokio::join!(cache.create(&slow_book), async {
            time::sleep(Duration::from_millis(10)).await;
            let created = cache.create(&new_book("Tentang Kamu")).await;
            assert_eq!(cache.state(MutationKind::Create).await, MutationState::Success);
            created
        });

        assert!(matches!(slow, Err(Error::Validation(_))));
        assert!(fast.is_ok());
        assert_eq!(cache.state(MutationKind::Create).await, MutationState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_fetched_across_an_invalidation_is_refetched() {
        let cache = MutationCache::new(PacedApi::default());
        let query = ListQuery::default();

        let (listed, ()) = tokio::join!(cache.list(&query), async {
            time::sleep(Duration::from_millis(10)).await;
            cache.invalidate();
        });
        listed.unwrap();

        cache.list(&query).await.unwrap();
        assert_eq!(cache.client().list_calls.load(Ordering::SeqCst), 2);

        cache.list(&query).await.unwrap();
        assert_eq!(cache.client().list_calls.load(Ordering::SeqCst), 2);
    }
}
