use isbn::Isbn13;
use reqwest::Url;
use time::OffsetDateTime;

use crate::{
    error::{self, Error},
    model::{BookPatch, NewBook},
};

pub fn current_year() -> i32 {
    OffsetDateTime::now_utc().year()
}

impl NewBook {
    pub fn validate(&self, current_year: i32) -> error::Result<()> {
        let mut violations = Violations::default();
        violations.required("title", &self.title);
        violations.required("author", &self.author);
        violations.isbn(self.isbn.as_deref());
        violations.published_year(self.published_year, current_year);
        violations.stock(self.stock);
        violations.cover_image(self.cover_image.as_deref());
        violations.into_result()
    }
}

impl BookPatch {
    pub fn validate(&self, current_year: i32) -> error::Result<()> {
        let mut violations = Violations::default();
        if let Some(title) = &self.title {
            violations.required("title", title);
        }
        if let Some(author) = &self.author {
            violations.required("author", author);
        }
        violations.isbn(self.isbn.as_deref());
        if let Some(year) = self.published_year {
            violations.published_year(year, current_year);
        }
        if let Some(stock) = self.stock {
            violations.stock(stock);
        }
        violations.cover_image(self.cover_image.as_deref());
        violations.into_result()
    }
}

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.0.push(format!("{field} must not be empty"));
        }
    }

    fn isbn(&mut self, isbn: Option<&str>) {
        if let Some(isbn) = isbn {
            if !is_isbn13(isbn) {
                self.0.push(format!("isbn `{isbn}` is not a valid ISBN-13"));
            }
        }
    }

    fn published_year(&mut self, year: i32, current_year: i32) {
        if year > current_year {
            self.0
                .push(format!("published_year must not be after {current_year}"));
        }
    }

    fn stock(&mut self, stock: i64) {
        if stock < 0 {
            self.0.push("stock must not be negative".to_owned());
        }
    }

    fn cover_image(&mut self, cover_image: Option<&str>) {
        if let Some(url) = cover_image {
            let well_formed = Url::parse(url)
                .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
                .unwrap_or(false);
            if !well_formed {
                self.0.push(format!("cover_image `{url}` is not a valid URL"));
            }
        }
    }

    fn into_result(self) -> error::Result<()> {
        let Self(violations) = self;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(violations.join("; ")))
        }
    }
}

// ISBN-13 with an optional `ISBN`/`ISBN-13:` label, written either as 13
// bare digits or as five groups split by `-` or spaces.
pub fn is_isbn13(text: &str) -> bool {
    let text = text.trim();
    let text = ["ISBN-13:", "ISBN-13", "ISBN:", "ISBN"]
        .iter()
        .find_map(|label| text.strip_prefix(label))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .unwrap_or(text);

    let groups: Vec<&str> = text.split(|c: char| c == '-' || c == ' ').collect();
    let shaped = match groups.as_slice() {
        [digits] => digits.len() == 13,
        [prefix, group, publisher, title, check] => {
            prefix.len() == 3
                && (1..=5).contains(&group.len())
                && !publisher.is_empty()
                && !title.is_empty()
                && check.len() == 1
        }
        _ => false,
    };
    if !shaped {
        return false;
    }

    let digits: Vec<u8> = groups
        .concat()
        .chars()
        .map_while(|c| c.to_digit(10).map(|d| d as u8))
        .collect();

    let Ok(digits) = <[u8; 13]>::try_from(digits) else {
        return false;
    };

    matches!(&digits[..3], [9, 7, 8] | [9, 7, 9]) && Isbn13::new(digits).is_ok()
}
