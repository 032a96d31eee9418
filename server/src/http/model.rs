use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::model::{self as domain, query};

pub fn book_id(text: &str) -> Option<domain::BookId> {
    Uuid::parse_str(text).ok().map(domain::BookId)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Book {
    id: String,
    #[serde(flatten)]
    info: domain::BookInfo,
    created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl From<domain::Book> for Book {
    fn from(domain::Book(id, info, provenance): domain::Book) -> Self {
        let domain::Provenance {
            created_by,
            created_at,
            updated_at,
        } = provenance;

        Self {
            id: id.to_string(),
            info,
            created_by,
            created_at,
            updated_at,
        }
    }
}

// Body of `POST /books`. Server-owned fields are ignored when present.
#[derive(Debug, Deserialize)]
pub struct NewBook(pub domain::BookInfo);

#[derive(Debug, Default, Deserialize)]
pub struct BookPatch {
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
    published_year: Option<i32>,
    stock: Option<i64>,
    cover_image: Option<String>,
}

impl From<BookPatch> for domain::BookChanges {
    fn from(
        BookPatch {
            title,
            author,
            isbn,
            published_year,
            stock,
            cover_image,
        }: BookPatch,
    ) -> Self {
        Self {
            title,
            author,
            isbn,
            published_year,
            stock,
            cover_image,
        }
    }
}

// Listing parameters arrive as raw text; anything unparseable falls back to
// the listing defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
    #[serde(rename = "orderBy")]
    order_by: Option<String>,
    order: Option<String>,
}

impl From<ListParams> for query::BookListing {
    fn from(
        ListParams {
            page,
            limit,
            search,
            order_by,
            order,
        }: ListParams,
    ) -> Self {
        let defaults = Self::default();
        let positive = |text: Option<String>| {
            text.and_then(|text| text.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
        };

        Self {
            page: positive(page).unwrap_or(defaults.page),
            limit: positive(limit).unwrap_or(defaults.limit),
            search: search
                .map(|search| search.trim().to_owned())
                .filter(|search| !search.is_empty()),
            order_by: order_by
                .as_deref()
                .map(query::SortField::parse_lenient)
                .unwrap_or_default(),
            descending: order.is_some_and(|order| order.eq_ignore_ascii_case("desc")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Meta {
    total: u64,
    page: u32,
    last_page: u32,
}

#[derive(Debug, Serialize)]
pub struct Envelope {
    data: Vec<Book>,
    meta: Meta,
}

impl From<query::Listing> for Envelope {
    fn from(
        query::Listing {
            books,
            total,
            page,
            last_page,
        }: query::Listing,
    ) -> Self {
        Self {
            data: books.into_iter().map(Book::from).collect(),
            meta: Meta {
                total,
                page,
                last_page,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Message {
    Text(String),
    Violations(Vec<String>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_list_params_fall_back_to_defaults() {
        let listing: query::BookListing = ListParams {
            page: Some("-2".to_owned()),
            limit: Some("lots".to_owned()),
            search: Some("   ".to_owned()),
            order_by: Some("shelf".to_owned()),
            order: Some("sideways".to_owned()),
        }
        .into();

        assert_eq!(listing.page, 1);
        assert_eq!(listing.limit, 12);
        assert_eq!(listing.search, None);
        assert_eq!(listing.order_by, query::SortField::Title);
        assert!(!listing.descending);
    }

    #[test]
    fn error_body_uses_camel_case() {
        let body = ErrorBody {
            status_code: 400,
            message: Message::Violations(vec!["stock must not be less than 0".to_owned()]),
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({
                "statusCode": 400,
                "message": ["stock must not be less than 0"],
            })
        );
    }
}
