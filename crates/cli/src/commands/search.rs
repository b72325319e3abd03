//! One-shot admin search.

use labmarket_client::Marketplace;
use labmarket_client::search::search;

use super::CommandError;

#[allow(clippy::print_stdout)]
pub async fn run(market: &Marketplace, query: &str) -> Result<(), CommandError> {
    let results = search(market.backend().as_ref(), query).await?;
    if results.is_empty() {
        println!("No results for \"{}\"", query.trim());
        return Ok(());
    }

    for hit in results {
        println!(
            "{:<14} {}  {:<9} {}{}  ({})",
            hit.kind.as_str(),
            hit.id,
            hit.status,
            hit.label,
            hit.email.map(|e| format!(" <{e}>")).unwrap_or_default(),
            hit.kind.route()
        );
    }
    Ok(())
}
