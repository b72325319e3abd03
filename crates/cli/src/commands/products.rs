//! Product moderation commands.

use labmarket_client::Marketplace;
use labmarket_client::live::{ProductFilter, ProductList};
use labmarket_client::pagination::PageRequest;
use labmarket_core::{ProductId, ProductStatus, RequestKind};

use super::{CommandError, loaded, print_footer};

/// Print one page of live products.
#[allow(clippy::print_stdout)]
pub async fn list(
    market: &Marketplace,
    kind: Option<RequestKind>,
    status: Option<ProductStatus>,
    category: Option<String>,
    page: u32,
) -> Result<(), CommandError> {
    let filter = ProductFilter {
        kind,
        status,
        category,
        seller_id: None,
    };
    let page_size = market.config().default_page_size;
    let list = ProductList::open(
        market.backend().clone(),
        market.hub().clone(),
        filter,
        PageRequest::new(page, page_size),
    )
    .await;

    let state = loaded(list.snapshot())?;
    for product in &state.items {
        let price = product
            .price
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "{}  {:<7} {:<8} {:>10}  {}",
            product.id, product.kind, product.status, price, product.title
        );
    }
    print_footer(state.total, list.page().page, page_size);
    Ok(())
}

/// Set a product's listing status.
pub async fn set_status(
    market: &Marketplace,
    id: ProductId,
    status: ProductStatus,
) -> Result<(), CommandError> {
    let list = market.products(ProductFilter::default()).await;
    list.update_status(id, status).await?;
    tracing::info!(product_id = %id, %status, "product status set");
    Ok(())
}

/// Soft-delete a product.
pub async fn delete(market: &Marketplace, id: ProductId) -> Result<(), CommandError> {
    let list = market.products(ProductFilter::default()).await;
    list.soft_delete(id).await?;
    tracing::info!(product_id = %id, "product deleted");
    Ok(())
}
