use api_client::model::{ListQuery, SortOrder};
use std::time::Duration;
use tokio::sync::watch;

use crate::{
    debounce::Debouncer,
    navigation::Navigator,
    query::{self, QueryParams},
};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct ListQueryController<N> {
    navigator: N,
    search_input: String,
    search: Debouncer<Option<String>>,
    changes: watch::Receiver<Option<String>>,
}

impl<N> ListQueryController<N>
where
    N: Navigator,
{
    pub fn new(navigator: N, debounce: Duration) -> Self {
        let initial = query::decode(&navigator.location()).search;
        let search = Debouncer::new(initial.clone(), debounce);
        let changes = search.subscribe();

        Self {
            navigator,
            search_input: initial.unwrap_or_default(),
            search,
            changes,
        }
    }

    pub fn set_search(&mut self, text: &str) {
        self.search_input = text.to_owned();
        self.update_params(&[("search", Some(text)), ("page", Some("1"))]);
        self.search.observe(settled_search(text));
    }

    pub fn set_sort(&mut self, order_by: &str, order: SortOrder) {
        self.update_params(&[
            ("orderBy", Some(order_by)),
            ("order", Some(order.as_str())),
            ("page", Some("1")),
        ]);
    }

    pub fn set_page_size(&mut self, limit: u32) {
        let limit = limit.to_string();
        self.update_params(&[("limit", Some(limit.as_str())), ("page", Some("1"))]);
    }

    pub fn set_page(&mut self, page: u32) {
        let page = page.to_string();
        self.update_params(&[("page", Some(page.as_str()))]);
    }

    // Re-reads the location after the navigator moved on its own, such as
    // a back or forward step. The search box and the settled search follow
    // the location at once.
    pub fn sync_from_location(&mut self) {
        let search = query::decode(&self.navigator.location()).search;
        self.search_input = search.clone().unwrap_or_default();
        self.search.reset(search);
    }

    pub fn query(&self) -> ListQuery {
        ListQuery {
            search: self.search.value(),
            ..query::decode(&self.navigator.location())
        }
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn location(&self) -> String {
        self.navigator.location()
    }

    pub async fn changed(&mut self) -> Option<String> {
        // The sender lives in `self.search`, so the channel outlives this wait.
        let _ = self.changes.changed().await;
        self.changes.borrow_and_update().clone()
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    // Only the given parameters change; an absent or empty value deletes one.
    fn update_params(&mut self, updates: &[(&str, Option<&str>)]) {
        let mut params = QueryParams::parse(&self.navigator.location());
        for (key, value) in updates {
            params.apply(key, *value);
        }

        let location = params.to_string();
        tracing::debug!(%location, "list location updated");
        self.navigator.push(location);
    }
}

fn settled_search(text: &str) -> Option<String> {
    Some(text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}
