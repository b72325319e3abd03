//! Command implementations.
//!
//! Output goes to stdout; diagnostics go through `tracing` to stderr.

pub mod products;
pub mod requests;
pub mod search;
pub mod sellers;

use labmarket_client::MarketError;
use labmarket_client::live::ListState;
use labmarket_client::pagination::Pagination;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Marketplace operation failed.
    #[error(transparent)]
    Market(#[from] MarketError),

    /// `--notify` was given but no email relay is configured.
    #[error("Email relay is not configured (set the EMAIL_* variables)")]
    EmailNotConfigured,

    /// Notification body failed to render.
    #[error("Failed to render notification: {0}")]
    Render(String),
}

/// Surface the load error of a freshly opened list, if any.
fn loaded<T>(state: ListState<T>) -> Result<ListState<T>, CommandError> {
    match state.error {
        Some(err) => Err(MarketError::Backend(err).into()),
        None => Ok(state),
    }
}

#[allow(clippy::print_stdout)]
fn print_footer(total: u64, page: u32, page_size: u32) {
    let mut pagination = Pagination::new(total, page_size);
    pagination.go_to_page(page);
    println!(
        "-- page {} of {} ({total} total)",
        pagination.current_page(),
        pagination.total_pages().max(1)
    );
}
