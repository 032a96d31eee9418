use isbn::Isbn13;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

pub mod query;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookId(pub Uuid);

impl BookId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(id) = self;
        write!(f, "{id}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookInfo {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub published_year: i32,
    pub stock: i64,
    pub cover_image: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Provenance {
    pub created_by: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Book(pub BookId, pub BookInfo, pub Provenance);

#[derive(Clone, Debug, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub stock: Option<i64>,
    pub cover_image: Option<String>,
}

impl BookChanges {
    pub fn apply_to(self, info: &BookInfo) -> BookInfo {
        let BookChanges {
            title,
            author,
            isbn,
            published_year,
            stock,
            cover_image,
        } = self;

        BookInfo {
            title: title.unwrap_or_else(|| info.title.clone()),
            author: author.unwrap_or_else(|| info.author.clone()),
            isbn: isbn.or_else(|| info.isbn.clone()),
            published_year: published_year.unwrap_or(info.published_year),
            stock: stock.unwrap_or(info.stock),
            cover_image: cover_image.or_else(|| info.cover_image.clone()),
        }
    }
}

pub enum Command {
    AddBook { info: BookInfo, created_by: String },
    ReviseBook(BookId, BookChanges),
    RemoveBook(BookId),
}

#[derive(Debug)]
pub enum CommandReceipt {
    Created(Book),
    Revised(Book),
    Removed,
    NotFound,
    Rejected(Vec<String>),
}

impl BookInfo {
    pub fn violations(&self, current_year: i32) -> Vec<String> {
        let mut violations = vec![];

        if self.title.trim().is_empty() {
            violations.push("title should not be empty".to_owned());
        }
        if self.author.trim().is_empty() {
            violations.push("author should not be empty".to_owned());
        }
        if self.isbn.as_deref().is_some_and(|isbn| !is_isbn13(isbn)) {
            violations.push("isbn must be an ISBN-13".to_owned());
        }
        if self.published_year > current_year {
            violations.push(format!(
                "published_year must not be greater than {current_year}"
            ));
        }
        if self.stock < 0 {
            violations.push("stock must not be less than 0".to_owned());
        }
        if self
            .cover_image
            .as_deref()
            .is_some_and(|cover_image| !is_web_address(cover_image))
        {
            violations.push("cover_image must be a URL address".to_owned());
        }

        violations
    }
}

// Thirteen digits, optionally split by `-` or spaces, with a 978/979 prefix
// and a correct check digit.
fn is_isbn13(text: &str) -> bool {
    let digits: Vec<u8> = text
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_digit(10).and_then(|d| u8::try_from(d).ok()))
        .collect::<Option<_>>()
        .unwrap_or_default();

    match <[u8; 13]>::try_from(digits) {
        Ok(digits) => {
            matches!(&digits[..3], [9, 7, 8] | [9, 7, 9]) && Isbn13::new(digits).is_ok()
        }
        Err(_) => false,
    }
}

fn is_web_address(text: &str) -> bool {
    Url::parse(text)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}
