use anyhow::{anyhow, bail, Error as AnyhowError, Result};
use bookdesk::BookGridPresenter;
use clap::{Args, Subcommand};
use std::{fmt, str::FromStr};
use tabled::{settings::Style, Table, Tabled};
use time::format_description::well_known::Rfc3339;

use super::domain;

#[derive(Subcommand)]
pub enum Command {
    #[command(about = "List books, driven by a location query string and list intents")]
    List(ListArgs),

    #[command(about = "Show every field of one book")]
    Show { id: String },

    #[command(about = "Add a book")]
    Add(BookInfo),

    #[command(about = "Change some fields of a book")]
    Edit {
        id: String,

        #[command(flatten)]
        changes: BookChanges,
    },

    #[command(about = "Delete a book; deleting one that is already gone succeeds")]
    Delete { id: String },
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, default_value = "", help = "Location to start from, e.g. `page=2&limit=8`")]
    pub location: String,

    #[arg(long, help = "Search title, author and ISBN")]
    pub search: Option<String>,

    #[arg(long, help = "Sort as FIELD or FIELD:ORDER, e.g. `published_year:desc`")]
    pub sort: Option<SortSpec>,

    #[arg(long, value_parser = page_size, help = "Books per page: 8, 12, 16 or 20")]
    pub limit: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: Option<u32>,
}

fn page_size(text: &str) -> Result<u32> {
    let limit = text.parse()?;
    if domain::PAGE_SIZES.contains(&limit) {
        Ok(limit)
    } else {
        bail!("page size must be one of {:?}", domain::PAGE_SIZES)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub order: domain::SortOrder,
}

impl FromStr for SortSpec {
    type Err = AnyhowError;

    fn from_str(text: &str) -> Result<Self> {
        let (field, order) = text.split_once(':').unwrap_or((text, "asc"));

        if !domain::SORT_FIELDS.contains(&field) {
            bail!(
                "unknown sort field `{field}`, expected one of {}",
                domain::SORT_FIELDS.join(", ")
            );
        }

        let order = match order {
            "asc" => domain::SortOrder::Asc,
            "desc" => domain::SortOrder::Desc,
            otherwise => return Err(anyhow!("unknown sort order `{otherwise}`")),
        };

        Ok(Self {
            field: field.to_owned(),
            order,
        })
    }
}

#[derive(Args)]
pub struct BookInfo {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub author: String,

    #[arg(long, help = "ISBN-13, e.g. 978-0-306-40615-7")]
    pub isbn: Option<String>,

    #[arg(long)]
    pub published_year: i32,

    #[arg(long, allow_negative_numbers = true)]
    pub stock: i64,

    #[arg(long, help = "http(s) URL of the cover image")]
    pub cover_image: Option<String>,
}

impl From<BookInfo> for domain::NewBook {
    fn from(
        BookInfo {
            title,
            author,
            isbn,
            published_year,
            stock,
            cover_image,
        }: BookInfo,
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

#[derive(Args)]
pub struct BookChanges {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub isbn: Option<String>,

    #[arg(long)]
    pub published_year: Option<i32>,

    #[arg(long, allow_negative_numbers = true)]
    pub stock: Option<i64>,

    #[arg(long)]
    pub cover_image: Option<String>,
}

impl From<BookChanges> for domain::BookPatch {
    fn from(
        BookChanges {
            title,
            author,
            isbn,
            published_year,
            stock,
            cover_image,
        }: BookChanges,
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

#[derive(Tabled)]
pub struct BookRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "ISBN")]
    isbn: String,
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Stock")]
    stock: i64,
    #[tabled(rename = "Added")]
    added: String,
}

impl From<&domain::Book> for BookRow {
    fn from(book: &domain::Book) -> Self {
        Self {
            id: book.id.to_string(),
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone().unwrap_or_default(),
            year: book.published_year,
            stock: book.stock,
            added: book
                .created_at
                .map(|at| at.date().to_string())
                .unwrap_or_default(),
        }
    }
}

pub fn book_table<'a, I>(books: I) -> String
where
    I: IntoIterator<Item = &'a domain::Book>,
{
    Table::new(books.into_iter().map(BookRow::from))
        .with(Style::rounded())
        .to_string()
}

pub struct BookDetails<'a>(pub &'a domain::Book);

impl fmt::Display for BookDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(book) = self;
        let timestamp = |at: Option<time::OffsetDateTime>| {
            at.and_then(|at| at.format(&Rfc3339).ok())
                .unwrap_or_else(|| "-".to_owned())
        };

        writeln!(f, "id:             {}", book.id)?;
        writeln!(f, "title:          {}", book.title)?;
        writeln!(f, "author:         {}", book.author)?;
        writeln!(f, "isbn:           {}", book.isbn.as_deref().unwrap_or("-"))?;
        writeln!(f, "published year: {}", book.published_year)?;
        writeln!(f, "stock:          {}", book.stock)?;
        writeln!(f, "cover image:    {}", book.cover_image.as_deref().unwrap_or("-"))?;
        writeln!(f, "created by:     {}", book.created_by.as_deref().unwrap_or("-"))?;
        writeln!(f, "created at:     {}", timestamp(book.created_at))?;
        write!(f, "updated at:     {}", timestamp(book.updated_at))
    }
}

#[derive(Default)]
pub struct TablePresenter {
    failure: Option<domain::ErrorKind>,
}

impl TablePresenter {
    pub fn finish(self) -> Result<()> {
        match self.failure {
            Some(kind) => bail!("listing books failed ({kind})"),
            None => Ok(()),
        }
    }
}

impl BookGridPresenter for TablePresenter {
    fn loading(&mut self, query: &domain::ListQuery) {
        tracing::debug!(key = %query.cache_key(), "loading books");
    }

    fn render(&mut self, _query: &domain::ListQuery, page: &domain::PagedResult<domain::Book>) {
        if page.items.is_empty() {
            println!("No books found.");
        } else {
            println!("{}", book_table(&page.items));
        }
        println!(
            "Page {} of {} ({} books, {} per page)",
            page.page,
            page.total_pages.max(1),
            page.total,
            page.limit
        );
    }

    fn failed(&mut self, _query: &domain::ListQuery, error: &domain::Error) {
        eprintln!("Could not list books: {error}");
        self.failure = Some(error.kind());
    }
}
