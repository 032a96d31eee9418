use std::{collections::HashMap, str::FromStr};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use model::{
    query::{Catalog, CatalogQuery},
    Book, BookInfo, Command, CommandReceipt, Provenance,
};

pub mod model;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub owner: String,
    pub token: String,
}

impl Grant {
    const DEFAULT_OWNER: &'static str = "librarian";

    pub fn new(owner: &str, token: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            token: token.to_owned(),
        }
    }
}

impl FromStr for Grant {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let (owner, token) = text
            .split_once('=')
            .unwrap_or((Self::DEFAULT_OWNER, text));

        if owner.trim().is_empty() || token.trim().is_empty() {
            Err(Error::InvalidGrant(text.to_owned()))
        } else {
            Ok(Self::new(owner.trim(), token.trim()))
        }
    }
}

pub struct Application {
    catalog: RwLock<Catalog>,
    owners_by_token: HashMap<String, String>,
}

impl Application {
    pub fn new<I>(grants: I) -> Self
    where
        I: IntoIterator<Item = Grant>,
    {
        Self {
            catalog: Default::default(),
            owners_by_token: grants
                .into_iter()
                .map(|Grant { owner, token }| (token, owner))
                .collect(),
        }
    }

    pub fn owner_of(&self, token: &str) -> Option<&str> {
        self.owners_by_token.get(token).map(String::as_str)
    }

    pub async fn issue_query<Q>(&self, query: Q) -> Q::Output
    where
        Q: CatalogQuery,
    {
        query.execute(&*self.catalog.read().await)
    }

    pub async fn submit_command(&self, command: Command) -> CommandReceipt {
        let now = OffsetDateTime::now_utc();
        let mut catalog = self.catalog.write().await;

        match command {
            Command::AddBook { info, created_by } => {
                let violations = info.violations(now.year());
                if !violations.is_empty() {
                    return CommandReceipt::Rejected(violations);
                }

                let book = Book(
                    model::BookId::fresh(),
                    info,
                    Provenance {
                        created_by,
                        created_at: now,
                        updated_at: now,
                    },
                );
                tracing::info!(id = %book.0, "book added");
                catalog.insert(book.clone());
                CommandReceipt::Created(book)
            }
            Command::ReviseBook(id, changes) => {
                let Some(Book(id, info, provenance)) = catalog.find(&id) else {
                    return CommandReceipt::NotFound;
                };

                let revised: BookInfo = changes.apply_to(&info);
                let violations = revised.violations(now.year());
                if !violations.is_empty() {
                    return CommandReceipt::Rejected(violations);
                }

                let book = Book(
                    id,
                    revised,
                    Provenance {
                        updated_at: now,
                        ..provenance
                    },
                );
                tracing::info!(%id, "book revised");
                catalog.insert(book.clone());
                CommandReceipt::Revised(book)
            }
            Command::RemoveBook(id) => {
                if catalog.remove(&id) {
                    tracing::info!(%id, "book removed");
                    CommandReceipt::Removed
                } else {
                    CommandReceipt::NotFound
                }
            }
        }
    }
}
