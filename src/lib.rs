pub mod controller;
pub mod debounce;
pub mod navigation;
pub mod query;
pub mod view;

pub use controller::{ListQueryController, SEARCH_DEBOUNCE};
pub use debounce::Debouncer;
pub use navigation::{History, Navigator};
pub use view::{BookGridPresenter, BookListView};
