//! Request review commands.
//!
//! Decisions go through the live request list so the pending-only
//! transition rule is enforced before anything is written.

use labmarket_client::backend::{Query, Table};
use labmarket_client::live::{RequestFilter, RequestList};
use labmarket_client::models::Request;
use labmarket_client::pagination::PageRequest;
use labmarket_client::services::OutgoingEmail;
use labmarket_client::{MarketError, Marketplace};
use labmarket_core::{RequestId, RequestKind, RequestStatus};

use super::{CommandError, loaded, print_footer};

#[allow(clippy::print_stdout)]
pub async fn list(
    market: &Marketplace,
    kind: RequestKind,
    status: Option<RequestStatus>,
    page: u32,
) -> Result<(), CommandError> {
    let page_size = market.config().default_page_size;
    let list = RequestList::open(
        market.backend().clone(),
        market.hub().clone(),
        RequestFilter { kind, status },
        PageRequest::new(page, page_size),
    )
    .await;

    let state = loaded(list.snapshot())?;
    for request in &state.items {
        println!(
            "{}  {:<8} {}  {} <{}>",
            request.id,
            request.status,
            request.created_at.format("%Y-%m-%d %H:%M"),
            request.user_name,
            request.user_email
        );
    }
    print_footer(state.total, list.page().page, page_size);
    Ok(())
}

/// Print a request and its line items.
#[allow(clippy::print_stdout)]
pub async fn show(market: &Marketplace, id: RequestId) -> Result<(), CommandError> {
    let request = fetch(market, id).await?;
    let list = market.requests(request.kind).await;
    let items = list.line_items(id).await?;

    println!("Request   {}", request.id);
    println!("Kind      {}", request.kind);
    println!("Status    {}", request.status);
    println!("Submitted {}", request.created_at.to_rfc3339());
    println!("Contact   {} <{}> {}", request.user_name, request.user_email, request.user_phone);
    println!();
    for (product, quantity) in items {
        match (request.kind, product.price) {
            (RequestKind::Buy, Some(price)) => {
                let total = price.times(quantity);
                println!("  {quantity:>3} x {}  @ {price} = {total}", product.title);
            }
            _ => println!("  {quantity:>3} x {}", product.title),
        }
    }
    Ok(())
}

/// Approve or reject a request, optionally emailing the requester.
pub async fn decide(
    market: &Marketplace,
    id: RequestId,
    status: RequestStatus,
    notify: bool,
) -> Result<(), CommandError> {
    let email = if notify {
        Some(market.email().ok_or(CommandError::EmailNotConfigured)?)
    } else {
        None
    };

    let request = fetch(market, id).await?;
    let list = market.requests(request.kind).await;
    list.update_status(id, status).await?;
    tracing::info!(request_id = %id, %status, "request decided");

    if let Some(client) = email {
        let message = OutgoingEmail::request_status(&request, status)
            .map_err(|e| CommandError::Render(e.to_string()))?;
        client.send(&message).await.map_err(MarketError::from)?;
        tracing::info!(request_id = %id, to = %request.user_email, "requester notified");
    }
    Ok(())
}

async fn fetch(market: &Marketplace, id: RequestId) -> Result<Request, CommandError> {
    let rows = market
        .backend()
        .select(&Query::on(Table::Requests).eq("id", id).limit(1))
        .await
        .map_err(MarketError::from)?;

    rows.decode::<Request>()
        .map_err(MarketError::from)?
        .into_iter()
        .next()
        .ok_or_else(|| MarketError::NotFound(format!("request {id}")).into())
}
