//! Seller account commands.

use labmarket_client::Marketplace;
use labmarket_client::live::{SellerFilter, SellerList};
use labmarket_client::pagination::PageRequest;
use labmarket_core::{SellerId, SellerStatus};

use super::{CommandError, loaded, print_footer};

#[allow(clippy::print_stdout)]
pub async fn list(
    market: &Marketplace,
    status: Option<SellerStatus>,
    page: u32,
) -> Result<(), CommandError> {
    let page_size = market.config().default_page_size;
    let list = SellerList::open(
        market.backend().clone(),
        market.hub().clone(),
        SellerFilter { status },
        PageRequest::new(page, page_size),
    )
    .await;

    let state = loaded(list.snapshot())?;
    for seller in &state.items {
        println!(
            "{}  {:<9} {:<30} {}",
            seller.id, seller.status, seller.company_name, seller.email
        );
    }
    print_footer(state.total, list.page().page, page_size);
    Ok(())
}

pub async fn set_status(
    market: &Marketplace,
    id: SellerId,
    status: SellerStatus,
) -> Result<(), CommandError> {
    let list = market.sellers(SellerFilter::default()).await;
    list.update_status(id, status).await?;
    tracing::info!(seller_id = %id, %status, "seller status set");
    Ok(())
}
