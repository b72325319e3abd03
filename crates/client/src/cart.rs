//! Session-scoped shopping carts.
//!
//! There are two independent carts, one per [`RequestKind`]. They live only
//! in memory: nothing here touches the backend and nothing survives a
//! restart. Submission reads a cart and clears it on success (see
//! [`checkout`](crate::checkout)).
//!
//! Every line holds a quantity of at least 1 and products are unique per
//! cart. [`Cart::set_quantity`] clamps instead of removing; removal is
//! always an explicit [`Cart::remove`].

use labmarket_core::{Price, ProductId, RequestKind};

use crate::models::Product;

/// A product plus how many of it the requester wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product: Product,
    quantity: u32,
}

impl CartLine {
    /// Always at least 1.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price times quantity; unpriced products count as zero.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.product.unit_price().times(self.quantity)
    }
}

/// One cart, holding lines in the order they were first added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    kind: RequestKind,
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart of `kind`.
    #[must_use]
    pub const fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Current lines.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity of `product_id`, or `None` if it is not in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.line(product_id).map(CartLine::quantity)
    }

    /// Add one unit of `product`.
    ///
    /// A product already in the cart has its quantity bumped by 1; the stored
    /// product details are refreshed from `product`.
    pub fn add(&mut self, product: Product) {
        if let Some(line) = self.line_mut(product.id) {
            line.quantity = line.quantity.saturating_add(1);
            line.product = product;
            return;
        }
        tracing::debug!(product_id = %product.id, kind = %self.kind, "added to cart");
        self.lines.push(CartLine {
            product,
            quantity: 1,
        });
    }

    /// Remove the line for `product_id`. Absent products are ignored.
    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product.id != product_id);
    }

    /// Set the quantity of `product_id`, clamped to at least 1.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> bool {
        let clamped = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        match self.line_mut(product_id) {
            Some(line) => {
                line.quantity = clamped;
                true
            }
            None => false,
        }
    }

    /// Change the quantity of `product_id` by `delta`.
    ///
    /// This is the stepper behind "+" and "-" buttons: when the new quantity
    /// would drop to 0 or below, the line is removed instead.
    pub fn adjust(&mut self, product_id: ProductId, delta: i64) {
        let Some(current) = self.quantity_of(product_id) else {
            return;
        };
        let next = i64::from(current).saturating_add(delta);
        if next <= 0 {
            self.remove(product_id);
        } else {
            self.set_quantity(product_id, next);
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Total amount of a buy cart. Donate carts have no amount.
    #[must_use]
    pub fn total_amount(&self) -> Option<Price> {
        match self.kind {
            RequestKind::Buy => Some(self.lines.iter().map(CartLine::subtotal).sum()),
            RequestKind::Donate => None,
        }
    }

    fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product.id == product_id)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product.id == product_id)
    }
}

/// The buy and donate carts of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carts {
    buy: Cart,
    donate: Cart,
}

impl Default for Carts {
    fn default() -> Self {
        Self::new()
    }
}

impl Carts {
    /// Two empty carts.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buy: Cart::new(RequestKind::Buy),
            donate: Cart::new(RequestKind::Donate),
        }
    }

    #[must_use]
    pub const fn get(&self, kind: RequestKind) -> &Cart {
        match kind {
            RequestKind::Buy => &self.buy,
            RequestKind::Donate => &self.donate,
        }
    }

    pub const fn get_mut(&mut self, kind: RequestKind) -> &mut Cart {
        match kind {
            RequestKind::Buy => &mut self.buy,
            RequestKind::Donate => &mut self.donate,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use labmarket_core::ProductStatus;

    fn product(title: &str, cents: Option<i64>) -> Product {
        Product {
            id: ProductId::generate(),
            title: title.to_string(),
            description: None,
            category: None,
            price: cents.map(Price::from_cents),
            image_url: None,
            kind: RequestKind::Buy,
            status: ProductStatus::Active,
            seller_id: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_add_twice_accumulates() {
        let mut cart = Cart::new(RequestKind::Buy);
        let p = product("Pipette", Some(1000));
        cart.add(p.clone());
        cart.add(p.clone());

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(p.id), Some(2));
    }

    #[test]
    fn test_set_quantity_zero_clamps_to_one() {
        let mut cart = Cart::new(RequestKind::Buy);
        let p = product("Pipette", None);
        cart.add(p.clone());

        assert!(cart.set_quantity(p.id, 0));
        assert_eq!(cart.quantity_of(p.id), Some(1));
        assert!(cart.set_quantity(p.id, -7));
        assert_eq!(cart.quantity_of(p.id), Some(1));
        assert!(cart.set_quantity(p.id, 5));
        assert_eq!(cart.quantity_of(p.id), Some(5));
    }

    #[test]
    fn test_set_quantity_unknown_product() {
        let mut cart = Cart::new(RequestKind::Donate);
        assert!(!cart.set_quantity(ProductId::generate(), 3));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new(RequestKind::Buy);
        cart.add(product("Scale", None));
        cart.remove(ProductId::generate());
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_adjust_removes_at_zero() {
        let mut cart = Cart::new(RequestKind::Buy);
        let p = product("Scale", None);
        cart.add(p.clone());
        cart.adjust(p.id, 2);
        assert_eq!(cart.quantity_of(p.id), Some(3));
        cart.adjust(p.id, -3);
        assert_eq!(cart.quantity_of(p.id), None);
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new(RequestKind::Buy);
        let a = product("A", Some(1050));
        let b = product("B", None);
        cart.add(a.clone());
        cart.add(b);
        cart.set_quantity(a.id, 3);

        assert_eq!(cart.total_quantity(), 4);
        assert_eq!(cart.total_amount().unwrap().to_string(), "31.50");
        assert_eq!(Cart::new(RequestKind::Donate).total_amount(), None);
    }

    #[test]
    fn test_carts_are_independent() {
        let mut carts = Carts::new();
        carts.get_mut(RequestKind::Buy).add(product("A", None));
        assert_eq!(carts.get(RequestKind::Buy).lines().len(), 1);
        assert!(carts.get(RequestKind::Donate).is_empty());

        carts.get_mut(RequestKind::Buy).clear();
        assert!(carts.get(RequestKind::Buy).is_empty());
    }
}
