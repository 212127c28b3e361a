//! Storefront search CLI - search, filter and share storefront queries.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use storefront_search::{
    render_text, url_state, ClientConfig, HttpSearchClient, Location, MemoryLocation,
    ResultView, SearchApi, SearchResponse, SearchSession, SearchSnapshot, SessionConfig, SortBy,
    SortOrder, UrlSynchronizer,
};

/// Storefront search - query the storefront catalogue from the terminal
#[derive(Parser)]
#[command(name = "storefront-search")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base URL of the storefront API
    #[arg(
        long,
        global = true,
        env = "STOREFRONT_API_URL",
        default_value = "http://localhost:3000/api"
    )]
    base_url: String,

    /// Request timeout in seconds
    #[arg(short, long, global = true, default_value = "10")]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalogue
    Search(SearchArgs),

    /// Show completions for a partial query
    Suggest {
        /// Partial query
        query: String,
    },

    /// Show or clear the search history
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: u32,

        /// Clear the history instead of showing it
        #[arg(long)]
        clear: bool,
    },

    /// List available categories
    Categories,

    /// List available tags
    Tags,

    /// List categories and tags together
    Facets,

    /// Print the shareable search URL for a query without searching
    Url(UrlArgs),
}

#[derive(Args)]
struct FilterArgs {
    /// Category id
    #[arg(short, long)]
    category: Option<String>,

    /// Required tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Lower price bound
    #[arg(long)]
    min_price: Option<f64>,

    /// Upper price bound
    #[arg(long)]
    max_price: Option<f64>,

    /// Earliest date (YYYY-MM-DD)
    #[arg(long)]
    date_from: Option<NaiveDate>,

    /// Latest date (YYYY-MM-DD)
    #[arg(long)]
    date_to: Option<NaiveDate>,

    /// Sort option: relevance, price_asc, price_desc, date_asc, date_desc
    #[arg(short, long)]
    sort: Option<SortBy>,

    /// Sort direction: asc or desc
    #[arg(long)]
    order: Option<SortOrder>,

    /// Page number
    #[arg(short, long)]
    page: Option<u32>,

    /// Start from a shared search URL (e.g. "/search?q=shoes&category=men");
    /// other options override its values
    #[arg(long)]
    from_url: Option<String>,
}

impl FilterArgs {
    /// Builds the search state these options describe.
    fn snapshot(self, query: Option<String>) -> Result<SearchSnapshot> {
        let mut snapshot = match &self.from_url {
            Some(url) => url_state::decode_strict(url)?,
            None => SearchSnapshot::default(),
        };

        if let Some(query) = query {
            snapshot.query = query;
        }

        let mut filters = snapshot.filters;
        if let Some(category) = self.category {
            filters = filters.with_category(category);
        }
        for tag in self.tags {
            filters = filters.with_tag(tag);
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let min = self.min_price.or(filters.min_price);
            let max = self.max_price.or(filters.max_price);
            filters = filters.with_price_range(min, max);
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let from = self.date_from.or(filters.date_from);
            let to = self.date_to.or(filters.date_to);
            filters = filters.with_date_range(from, to);
        }
        if let Some(sort) = self.sort {
            filters = filters.with_sort(sort);
        }
        if let Some(order) = self.order {
            filters = filters.with_sort_order(order);
        }
        let filters = filters.normalized();
        filters.validate()?;
        snapshot.filters = filters;

        if let Some(page) = self.page {
            if page == 0 {
                anyhow::bail!("Page must be at least 1");
            }
            snapshot.page = page;
        }

        Ok(snapshot)
    }
}

#[derive(Args)]
struct SearchArgs {
    /// Search query (empty lists everything)
    query: Option<String>,

    #[command(flatten)]
    filters: FilterArgs,

    /// Results per page
    #[arg(short, long, default_value = "10")]
    limit: u32,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Do not record the search in the history
    #[arg(long)]
    no_history: bool,
}

#[derive(Args)]
struct UrlArgs {
    /// Search query
    query: Option<String>,

    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = ClientConfig::new(&cli.base_url).with_timeout(cli.timeout);
    let connect = || -> Result<Arc<HttpSearchClient>> {
        Ok(Arc::new(HttpSearchClient::new(&config)?))
    };

    match cli.command {
        Commands::Search(args) => run_search(connect()?, args).await,
        Commands::Suggest { query } => suggest(connect()?.as_ref(), &query).await,
        Commands::History { limit, clear } => history(connect()?.as_ref(), limit, clear).await,
        Commands::Categories => {
            print_list("Categories", &connect()?.categories().await?);
            Ok(())
        }
        Commands::Tags => {
            print_list("Tags", &connect()?.tags().await?);
            Ok(())
        }
        Commands::Facets => {
            let client = connect()?;
            let (categories, tags) = futures::try_join!(client.categories(), client.tags())?;
            print_list("Categories", &categories);
            println!();
            print_list("Tags", &tags);
            Ok(())
        }
        Commands::Url(args) => print_url(args),
    }
}

async fn run_search(client: Arc<HttpSearchClient>, args: SearchArgs) -> Result<()> {
    let snapshot = args.filters.snapshot(args.query)?;
    let config = SessionConfig {
        page_size: args.limit,
        record_history: false,
        search_empty_query: true,
        ..Default::default()
    };

    let location = Arc::new(MemoryLocation::default());
    let session = SearchSession::start(client.clone(), config, Some(snapshot))?;
    let sync = UrlSynchronizer::new(location.clone()).spawn(session.subscribe_state());

    let view = session
        .subscribe_view()
        .wait_for(|v| !v.is_loading() && *v != ResultView::Idle)
        .await?
        .clone();
    let state = session.state();
    session.shutdown().await;
    sync.await?;

    let response = match &view {
        ResultView::Error(message) => anyhow::bail!("Search failed: {}", message),
        ResultView::Populated(response) => response.clone(),
        _ => SearchResponse::from_page(Vec::new(), 0, state.page, state.limit),
    };

    if !args.no_history && !state.query.trim().is_empty() {
        if let Err(e) = client.add_history(&state.query, response.total).await {
            warn!("failed to record search history: {}", e);
        }
    }

    match args.format {
        OutputFormat::Text => {
            println!("{}", render_text(&view, &state.query));
            println!("\nShare: {}", location.href());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Compact => {
            for result in &response.results {
                println!("{}\t{}", result.title, result.url);
            }
        }
    }

    Ok(())
}

async fn suggest(client: &HttpSearchClient, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("Query must not be empty");
    }
    for suggestion in client.suggestions(query).await? {
        let kind = serde_json::to_value(suggestion.kind)?;
        println!("{}\t{}", suggestion.text, kind.as_str().unwrap_or_default());
    }
    Ok(())
}

async fn history(client: &HttpSearchClient, limit: u32, clear: bool) -> Result<()> {
    if clear {
        client.clear_history().await?;
        println!("Search history cleared.");
        return Ok(());
    }

    let items = client.history(limit).await?;
    if items.is_empty() {
        println!("No search history.");
        return Ok(());
    }
    for item in items {
        println!(
            "{}  {}  ({} results)",
            item.timestamp.format("%Y-%m-%d %H:%M"),
            item.query,
            item.results_count
        );
    }
    Ok(())
}

fn print_url(args: UrlArgs) -> Result<()> {
    let snapshot = args.filters.snapshot(args.query)?;
    let location = MemoryLocation::default();
    location.replace_query(&url_state::encode(&snapshot));
    println!("{}", location.href());
    Ok(())
}

fn print_list(title: &str, items: &[String]) {
    println!("{}:", title);
    if items.is_empty() {
        println!("  (none)");
    }
    for item in items {
        println!("  {}", item);
    }
}
