use std::{cmp::Ordering, collections::HashMap};

use crate::core::model::{Book, BookId, BookInfo, Provenance};

#[derive(Debug, Default)]
pub struct Catalog {
    books: HashMap<BookId, (BookInfo, Provenance)>,
}

impl Catalog {
    pub fn insert(&mut self, Book(id, info, provenance): Book) {
        self.books.insert(id, (info, provenance));
    }

    pub fn remove(&mut self, id: &BookId) -> bool {
        self.books.remove(id).is_some()
    }

    pub fn find(&self, id: &BookId) -> Option<Book> {
        self.books
            .get(id)
            .map(|(info, provenance)| Book(*id, info.clone(), provenance.clone()))
    }
}

pub trait CatalogQuery {
    type Output;

    fn execute(&self, catalog: &Catalog) -> Self::Output;
}

pub struct BookById(pub BookId);

impl CatalogQuery for BookById {
    type Output = Option<Book>;

    fn execute(&self, catalog: &Catalog) -> Self::Output {
        let Self(id) = self;
        catalog.find(id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Title,
    Author,
    PublishedYear,
    Stock,
    CreatedAt,
}

impl SortField {
    // Unknown fields sort by title.
    pub fn parse_lenient(name: &str) -> Self {
        match name {
            "author" => SortField::Author,
            "published_year" => SortField::PublishedYear,
            "stock" => SortField::Stock,
            "created_at" => SortField::CreatedAt,
            _ => SortField::Title,
        }
    }

    fn compare(&self, (a, a_at): (&BookInfo, &Provenance), (b, b_at): (&BookInfo, &Provenance)) -> Ordering {
        match self {
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Author => a.author.to_lowercase().cmp(&b.author.to_lowercase()),
            SortField::PublishedYear => a.published_year.cmp(&b.published_year),
            SortField::Stock => a.stock.cmp(&b.stock),
            SortField::CreatedAt => a_at.created_at.cmp(&b_at.created_at),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BookListing {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub order_by: SortField,
    pub descending: bool,
}

impl Default for BookListing {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 12,
            search: None,
            order_by: SortField::Title,
            descending: false,
        }
    }
}

#[derive(Debug)]
pub struct Listing {
    pub books: Vec<Book>,
    pub total: u64,
    pub page: u32,
    pub last_page: u32,
}

impl CatalogQuery for BookListing {
    type Output = Listing;

    fn execute(&self, catalog: &Catalog) -> Self::Output {
        let needle = self.search.as_deref().map(str::to_lowercase);

        let mut matches: Vec<_> = catalog
            .books
            .iter()
            .filter(|(_, (info, _))| match &needle {
                Some(needle) => [Some(&info.title), Some(&info.author), info.isbn.as_ref()]
                    .into_iter()
                    .flatten()
                    .any(|text| text.to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .collect();

        matches.sort_by(|(a_id, (a, a_at)), (b_id, (b, b_at))| {
            let ordering = self.order_by.compare((a, a_at), (b, b_at));
            let ordering = if self.descending {
                ordering.reverse()
            } else {
                ordering
            };
            // Ties keep a stable order across pages.
            ordering
                .then_with(|| a_at.created_at.cmp(&b_at.created_at))
                .then_with(|| a_id.0.cmp(&b_id.0))
        });

        let total = matches.len() as u64;
        let limit = self.limit.max(1);
        let last_page = total.div_ceil(u64::from(limit)) as u32;
        let offset = (self.page.max(1) as usize - 1) * limit as usize;

        let books = matches
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .map(|(id, (info, provenance))| Book(*id, info.clone(), provenance.clone()))
            .collect();

        Listing {
            books,
            total,
            page: self.page.max(1),
            last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};

    fn catalog(titles: &[(&str, i32)]) -> Catalog {
        let start = OffsetDateTime::now_utc();
        let mut catalog = Catalog::default();
        for (index, (title, year)) in titles.iter().enumerate() {
            let at = start + Duration::seconds(index as i64);
            catalog.insert(Book(
                BookId::fresh(),
                BookInfo {
                    title: (*title).to_owned(),
                    author: format!("Author {index}"),
                    isbn: None,
                    published_year: *year,
                    stock: index as i64,
                    cover_image: None,
                },
                Provenance {
                    created_by: "librarian".to_owned(),
                    created_at: at,
                    updated_at: at,
                },
            ));
        }
        catalog
    }

    fn titles(listing: &Listing) -> Vec<&str> {
        listing
            .books
            .iter()
            .map(|Book(_, info, _)| info.title.as_str())
            .collect()
    }

    #[test]
    fn pages_round_up() {
        let names: Vec<String> = (0..25).map(|n| format!("Book {n:02}")).collect();
        let entries: Vec<(&str, i32)> = names.iter().map(|n| (n.as_str(), 2000)).collect();
        let catalog = catalog(&entries);

        let listing = BookListing {
            page: 3,
            ..Default::default()
        }
        .execute(&catalog);

        assert_eq!(listing.total, 25);
        assert_eq!(listing.last_page, 3);
        assert_eq!(titles(&listing), ["Book 24"]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let catalog = catalog(&[("Ronggeng Dukuh Paruk", 1982), ("Negeri 5 Menara", 2009)]);
        let listing = BookListing {
            search: Some("MENARA".to_owned()),
            ..Default::default()
        }
        .execute(&catalog);

        assert_eq!(titles(&listing), ["Negeri 5 Menara"]);
        assert_eq!(listing.total, 1);
    }

    #[test]
    fn sorts_by_requested_field_and_direction() {
        let catalog = catalog(&[("Ayat-Ayat Cinta", 2004), ("Supernova", 2001), ("Gadis Kretek", 2012)]);

        let listing = BookListing {
            order_by: SortField::PublishedYear,
            descending: true,
            ..Default::default()
        }
        .execute(&catalog);
        assert_eq!(titles(&listing), ["Gadis Kretek", "Ayat-Ayat Cinta", "Supernova"]);

        let listing = BookListing::default().execute(&catalog);
        assert_eq!(titles(&listing), ["Ayat-Ayat Cinta", "Gadis Kretek", "Supernova"]);
    }

    #[test]
    fn unknown_sort_field_falls_back_to_title() {
        assert_eq!(SortField::parse_lenient("shelf"), SortField::Title);
        assert_eq!(SortField::parse_lenient("stock"), SortField::Stock);
    }
}
