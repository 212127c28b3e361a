//! Example: Restore a search from a shared URL, refine it and print the results.

use std::sync::Arc;

use storefront_search::{
    render_text, ClientConfig, HttpSearchClient, MemoryLocation, ResultView, SearchFilters,
    SearchSession, SessionConfig, SortBy, UrlSynchronizer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let base_url = std::env::var("STOREFRONT_API_URL")
        .unwrap_or_else(|_| "http://localhost:3000/api".to_string());
    let client = HttpSearchClient::new(&ClientConfig::new(base_url))?;

    // The address a visitor landed on
    let location = Arc::new(MemoryLocation::parse(
        "/search?q=%E3%82%A4%E3%83%A4%E3%83%9B%E3%83%B3&category=electronics",
    ));
    let sync = UrlSynchronizer::new(location.clone());
    let seed = sync.seed();
    println!("Restored query: {} ({:?})", seed.query, seed.filters.category);

    let session = SearchSession::start(Arc::new(client), SessionConfig::default(), Some(seed))?;
    sync.spawn(session.subscribe_state());

    let mut view = session.subscribe_view();
    view.wait_for(|v| !v.is_loading() && *v != ResultView::Idle)
        .await?;
    println!("{}", render_text(&session.view(), &session.state().query));

    // Narrow the search down; the URL follows
    session.set_filters(
        SearchFilters::new()
            .with_category("electronics")
            .with_price_range(Some(1000.0), Some(5000.0))
            .with_sort(SortBy::PriceAsc),
    )?;
    view.changed().await?;
    view.wait_for(|v| !v.is_loading() && *v != ResultView::Idle)
        .await?;

    println!("{}", render_text(&session.view(), &session.state().query));
    println!("Shareable URL: {}", location.href());

    session.shutdown().await;
    Ok(())
}
