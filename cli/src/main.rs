use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use api_client::{validation, ApiClient, MutationCache, Session};
use bookdesk::{BookListView, History, ListQueryController, SEARCH_DEBOUNCE};

pub mod model;

mod domain {
    pub use api_client::{model::*, Error, ErrorKind};
}

#[derive(Parser)]
#[command(name = "bookdesk", version)]
#[command(about = "Manage the books of a bookdesk library")]
struct CliArgs {
    #[arg(
        long,
        env = "BOOKDESK_API_URL",
        default_value = "http://127.0.0.1:3000",
        help = "Base URL of the books API"
    )]
    base_url: String,

    #[arg(long, env = "BOOKDESK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: model::Command,
}

struct Dashboard(BookListView<ApiClient>);

impl Dashboard {
    fn new(client: ApiClient) -> Self {
        Self(BookListView::new(MutationCache::new(client)))
    }

    async fn dispatch(&self, command: model::Command) -> Result<()> {
        let Self(view) = self;
        let books = view.cache();

        match command {
            model::Command::List(args) => self.list(args).await,
            model::Command::Show { id } => {
                let book = books.get(&domain::BookId(id)).await?;
                println!("{}", model::BookDetails(&book));
                Ok(())
            }
            model::Command::Add(info) => {
                let book = domain::NewBook::from(info);
                book.validate(validation::current_year())?;

                let created = books.create(&book).await?;
                println!("{}", model::book_table([&created]));
                Ok(())
            }
            model::Command::Edit { id, changes } => {
                let patch = domain::BookPatch::from(changes);
                if patch.is_empty() {
                    bail!("nothing to change, pass at least one field");
                }
                patch.validate(validation::current_year())?;

                let updated = books.update(&domain::BookId(id), &patch).await?;
                println!("{}", model::book_table([&updated]));
                Ok(())
            }
            model::Command::Delete { id } => {
                let id = domain::BookId(id);
                books.delete(&id).await?;
                println!("Deleted {id}");
                Ok(())
            }
        }
    }

    async fn list(
        &self,
        model::ListArgs {
            location,
            search,
            sort,
            limit,
            page,
        }: model::ListArgs,
    ) -> Result<()> {
        let Self(view) = self;
        let mut controller = ListQueryController::new(History::new(&location), SEARCH_DEBOUNCE);

        if let Some(search) = search {
            controller.set_search(&search);
        }
        if let Some(model::SortSpec { field, order }) = sort {
            controller.set_sort(&field, order);
        }
        if let Some(limit) = limit {
            controller.set_page_size(limit);
        }
        if let Some(page) = page {
            controller.set_page(page);
        }
        // Nobody is typing here, the search in the location is final.
        controller.sync_from_location();

        println!("?{}", controller.location());

        let mut presenter = model::TablePresenter::default();
        view.present(controller.query(), &mut presenter).await;
        presenter.finish()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let CliArgs {
        base_url,
        token,
        command,
    } = CliArgs::parse();

    let session = token.map(Session::signed_in).unwrap_or_default();
    let client = ApiClient::new(&base_url, session);

    Dashboard::new(client).dispatch(command).await
}
