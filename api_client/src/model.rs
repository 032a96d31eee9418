use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BookId(pub String);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(id) = self;
        write!(f, "{id}")
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub published_year: i32,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub published_year: i32,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

// Partial update. Absent fields are not serialized and stay untouched
// server-side.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl From<NewBook> for BookPatch {
    fn from(
        NewBook {
            title,
            author,
            isbn,
            published_year,
            stock,
            cover_image,
        }: NewBook,
    ) -> Self {
        Self {
            title: Some(title),
            author: Some(author),
            isbn,
            published_year: Some(published_year),
            stock: Some(stock),
            cover_image,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse_lenient(text: &str) -> Self {
        if text == "desc" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const PAGE_SIZES: [u32; 4] = [8, 12, 16, 20];

pub const SORT_FIELDS: [&str; 5] = ["title", "author", "published_year", "stock", "created_at"];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub order_by: String,
    pub order: SortOrder,
}

impl ListQuery {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 12;
    pub const DEFAULT_ORDER_BY: &'static str = "title";

    pub fn cache_key(&self) -> String {
        format!(
            "page={}&limit={}&search={}&orderBy={}&order={}",
            self.page,
            self.limit,
            self.search.as_deref().unwrap_or_default(),
            self.order_by,
            self.order
        )
    }

    pub fn request_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        params.push(("orderBy", self.order_by.clone()));
        params.push(("order", self.order.to_string()));
        params
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
            search: None,
            order_by: Self::DEFAULT_ORDER_BY.to_owned(),
            order: SortOrder::Asc,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn total_pages_for(total: u64, limit: u32) -> u32 {
        if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit)) as u32
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BooksEnvelope {
    pub data: Vec<Book>,
    pub meta: BooksMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BooksMeta {
    pub total: u64,
    pub page: u32,
    pub last_page: u32,
}

impl BooksEnvelope {
    // The backend does not echo `limit`, so the requested one is carried over.
    pub fn into_paged(self, limit: u32) -> PagedResult<Book> {
        let BooksEnvelope {
            data,
            meta:
                BooksMeta {
                    total,
                    page,
                    last_page,
                },
        } = self;

        PagedResult {
            items: data,
            page,
            limit,
            total,
            total_pages: last_page,
        }
    }
}
