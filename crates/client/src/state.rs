//! Marketplace session state.
//!
//! [`Marketplace`] bundles the backend, change hub, email relay and config.
//! It is cheaply cloneable via `Arc`; the carts are owned separately by the
//! session so their mutation stays explicit.

use std::sync::Arc;

use labmarket_core::{ContactInfo, RequestKind};

use crate::backend::{Backend, BackendError, ChangeHub, RestBackend};
use crate::cart::Cart;
use crate::checkout::{self, Registration, Submission};
use crate::config::MarketConfig;
use crate::error::MarketError;
use crate::live::{ProductFilter, ProductList, RequestFilter, RequestList, SellerFilter, SellerList};
use crate::models::SellerRegistration;
use crate::pagination::PageRequest;
use crate::search::SearchBox;
use crate::services::EmailRelayClient;

/// Shared handles for one marketplace session.
#[derive(Clone)]
pub struct Marketplace {
    inner: Arc<MarketplaceInner>,
}

struct MarketplaceInner {
    config: MarketConfig,
    backend: Arc<dyn Backend>,
    hub: ChangeHub,
    email: Option<EmailRelayClient>,
}

impl std::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("backend", &self.inner.config.backend)
            .field("email", &self.inner.email.is_some())
            .finish_non_exhaustive()
    }
}

impl Marketplace {
    /// Connect to the hosted backend described by `config`.
    ///
    /// Change notifications reach live lists through [`Marketplace::hub`];
    /// whatever carries the backend's realtime feed publishes there.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(config: MarketConfig) -> Result<Self, BackendError> {
        let backend = Arc::new(RestBackend::new(&config.backend)?);
        Ok(Self::with_backend(config, backend, ChangeHub::new()))
    }

    /// Use an existing backend and hub.
    #[must_use]
    pub fn with_backend(config: MarketConfig, backend: Arc<dyn Backend>, hub: ChangeHub) -> Self {
        let email = config.email.clone().map(EmailRelayClient::new);
        Self {
            inner: Arc::new(MarketplaceInner {
                config,
                backend,
                hub,
                email,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MarketConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    #[must_use]
    pub fn hub(&self) -> &ChangeHub {
        &self.inner.hub
    }

    /// Email relay, when configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailRelayClient> {
        self.inner.email.as_ref()
    }

    /// First page at the configured page size.
    #[must_use]
    pub fn first_page(&self) -> PageRequest {
        PageRequest::new(1, self.inner.config.default_page_size)
    }

    /// Open a live product list on the first page.
    pub async fn products(&self, filter: ProductFilter) -> ProductList {
        ProductList::open(
            self.backend().clone(),
            self.hub().clone(),
            filter,
            self.first_page(),
        )
        .await
    }

    /// Open a live request list on the first page.
    pub async fn requests(&self, kind: RequestKind) -> RequestList {
        RequestList::open(
            self.backend().clone(),
            self.hub().clone(),
            RequestFilter::kind(kind),
            self.first_page(),
        )
        .await
    }

    /// Open a live seller list on the first page.
    pub async fn sellers(&self, filter: SellerFilter) -> SellerList {
        SellerList::open(
            self.backend().clone(),
            self.hub().clone(),
            filter,
            self.first_page(),
        )
        .await
    }

    /// Start an admin search box with the configured debounce.
    #[must_use]
    pub fn search_box(&self) -> SearchBox {
        SearchBox::spawn(self.backend().clone(), self.inner.config.search_debounce)
    }

    /// Submit `cart`; see [`checkout::submit`].
    ///
    /// # Errors
    ///
    /// See [`checkout::submit`].
    pub async fn submit(
        &self,
        cart: &mut Cart,
        contact: &ContactInfo,
    ) -> Result<Submission, MarketError> {
        checkout::submit(self.backend().as_ref(), cart, contact).await
    }

    /// Queue a seller registration; see [`checkout::register_seller`].
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Backend`] if the insert fails.
    pub async fn register_seller(
        &self,
        form: SellerRegistration,
    ) -> Result<Registration, MarketError> {
        checkout::register_seller(self.backend().as_ref(), form).await
    }
}
