//! In-memory storage backend.
//!
//! Backs development runs (`MAPLEMART_BACKEND=memory`) and the workspace's
//! integration tests, where persistence is not required. All collections live
//! behind a single `RwLock`, which makes the compound operations (checkout
//! commit, cancellation, default-address promotion) trivially atomic: they
//! hold the write lock for their full duration and never await while locked.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use maplemart_core::{AddressId, CartItemId, OrderId, OrderStatus, ProductId, UserId};

use super::{
    AddressBook, CancelError, CartStore, CatalogStore, CheckoutError, OrderLedger, StockError,
    StockLedger, StoreError,
};
use crate::models::{
    Address, Cart, CartItem, NewAddress, NewProduct, Order, OrderDraft, Product, ProductPatch,
};

/// Thread-safe in-memory implementation of every store trait.
#[derive(Clone, Default)]
pub struct MemoryStores {
    state: Arc<RwLock<State>>,
}

#[derive(Default)]
struct State {
    next_product: i32,
    next_cart_item: i32,
    next_address: i32,
    next_order: i32,
    products: BTreeMap<i32, Product>,
    carts: HashMap<UserId, Vec<CartItem>>,
    addresses: BTreeMap<i32, Address>,
    orders: BTreeMap<i32, Order>,
}

impl MemoryStores {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().expect("store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().expect("store lock poisoned")
    }
}

impl State {
    fn cart_of(&self, user: UserId) -> Cart {
        Cart {
            user_id: user,
            items: self.carts.get(&user).cloned().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStores {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut state = self.write();
        state.next_product += 1;
        let now = Utc::now();
        let stored = Product {
            id: ProductId::new(state.next_product),
            title: product.title,
            description: product.description,
            categories: product.categories,
            original_price: product.original_price,
            current_price: product.current_price,
            tax_rate: product.tax_rate,
            in_stock: product.in_stock,
            visible: true,
            stock: product.stock,
            main_images: product.main_images,
            gallery: product.gallery,
            key_benefits: product.key_benefits,
            detail_blocks: product.detail_blocks,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(stored.id.as_i32(), stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read().products.get(&id.as_i32()).cloned())
    }

    async fn list(&self, only_visible: bool) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .read()
            .products
            .values()
            .filter(|p| !only_visible || p.visible)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let mut state = self.write();
        let Some(existing) = state.products.get(&id.as_i32()).cloned() else {
            return Ok(None);
        };
        let updated = patch.apply(existing, Utc::now());
        state.products.insert(id.as_i32(), updated.clone());
        Ok(Some(updated))
    }

    async fn set_visibility(
        &self,
        id: ProductId,
        visible: bool,
    ) -> Result<Option<Product>, StoreError> {
        let mut state = self.write();
        Ok(state.products.get_mut(&id.as_i32()).map(|product| {
            product.visible = visible;
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn delete(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.write().products.remove(&id.as_i32()))
    }
}

#[async_trait]
impl StockLedger for MemoryStores {
    async fn reserve(&self, id: ProductId, qty: i32) -> Result<i32, StockError> {
        let mut state = self.write();
        let product = state
            .products
            .get_mut(&id.as_i32())
            .ok_or(StockError::NotFound)?;
        if product.stock < qty {
            return Err(StockError::Insufficient {
                available: product.stock,
            });
        }
        product.stock -= qty;
        Ok(product.stock)
    }

    async fn restore(&self, id: ProductId, qty: i32) -> Result<i32, StockError> {
        let mut state = self.write();
        let product = state
            .products
            .get_mut(&id.as_i32())
            .ok_or(StockError::NotFound)?;
        product.stock += qty;
        Ok(product.stock)
    }
}

#[async_trait]
impl CartStore for MemoryStores {
    async fn get(&self, user: UserId) -> Result<Cart, StoreError> {
        Ok(self.read().cart_of(user))
    }

    async fn add(&self, user: UserId, product: ProductId, qty: i32) -> Result<Cart, StoreError> {
        let mut state = self.write();
        state.next_cart_item += 1;
        let next_id = state.next_cart_item;
        let items = state.carts.entry(user).or_default();
        if let Some(item) = items.iter_mut().find(|item| item.product_id == product) {
            item.quantity += qty;
        } else {
            items.push(CartItem {
                id: CartItemId::new(next_id),
                product_id: product,
                quantity: qty,
            });
        }
        Ok(state.cart_of(user))
    }

    async fn update_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        qty: i32,
    ) -> Result<Option<Cart>, StoreError> {
        let mut state = self.write();
        let Some(line) = state
            .carts
            .get_mut(&user)
            .and_then(|items| items.iter_mut().find(|line| line.id == item))
        else {
            return Ok(None);
        };
        line.quantity = qty;
        Ok(Some(state.cart_of(user)))
    }

    async fn remove(&self, user: UserId, item: CartItemId) -> Result<Option<Cart>, StoreError> {
        let mut state = self.write();
        let Some(items) = state.carts.get_mut(&user) else {
            return Ok(None);
        };
        let before = items.len();
        items.retain(|line| line.id != item);
        if items.len() == before {
            return Ok(None);
        }
        Ok(Some(state.cart_of(user)))
    }

    async fn clear(&self, user: UserId) -> Result<Cart, StoreError> {
        let mut state = self.write();
        state.carts.remove(&user);
        Ok(Cart::empty(user))
    }
}

#[async_trait]
impl AddressBook for MemoryStores {
    async fn list(&self, user: UserId) -> Result<Vec<Address>, StoreError> {
        let state = self.read();
        let mut addresses: Vec<Address> = state
            .addresses
            .values()
            .filter(|address| address.user_id == user)
            .cloned()
            .collect();
        // Default first, then most recently created.
        addresses.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.as_i32().cmp(&a.id.as_i32()))
        });
        Ok(addresses)
    }

    async fn get(&self, id: AddressId) -> Result<Option<Address>, StoreError> {
        Ok(self.read().addresses.get(&id.as_i32()).cloned())
    }

    async fn create(&self, user: UserId, address: NewAddress) -> Result<Address, StoreError> {
        let mut state = self.write();
        if address.is_default {
            demote_defaults(&mut state, user, None);
        }
        state.next_address += 1;
        let stored = Address {
            id: AddressId::new(state.next_address),
            user_id: user,
            first_name: address.first_name,
            last_name: address.last_name,
            street: address.street,
            city: address.city,
            state: address.state,
            zip_code: address.zip_code,
            country: address.country,
            phone: address.phone,
            is_default: address.is_default,
            created_at: Utc::now(),
        };
        state.addresses.insert(stored.id.as_i32(), stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        id: AddressId,
        address: NewAddress,
    ) -> Result<Option<Address>, StoreError> {
        let mut state = self.write();
        let Some(existing) = state.addresses.get(&id.as_i32()).cloned() else {
            return Ok(None);
        };
        if address.is_default {
            demote_defaults(&mut state, existing.user_id, Some(id));
        }
        let updated = Address {
            first_name: address.first_name,
            last_name: address.last_name,
            street: address.street,
            city: address.city,
            state: address.state,
            zip_code: address.zip_code,
            country: address.country,
            phone: address.phone,
            is_default: address.is_default,
            ..existing
        };
        state.addresses.insert(id.as_i32(), updated.clone());
        Ok(Some(updated))
    }

    async fn set_default(&self, id: AddressId) -> Result<Option<Address>, StoreError> {
        let mut state = self.write();
        let Some(owner) = state.addresses.get(&id.as_i32()).map(|a| a.user_id) else {
            return Ok(None);
        };
        demote_defaults(&mut state, owner, Some(id));
        let address = state
            .addresses
            .get_mut(&id.as_i32())
            .expect("address present under lock");
        address.is_default = true;
        Ok(Some(address.clone()))
    }

    async fn delete(&self, id: AddressId) -> Result<bool, StoreError> {
        Ok(self.write().addresses.remove(&id.as_i32()).is_some())
    }
}

/// Clear the default flag on every address of `user`, except `keep`.
fn demote_defaults(state: &mut State, user: UserId, keep: Option<AddressId>) {
    for address in state.addresses.values_mut() {
        if address.user_id == user && Some(address.id) != keep {
            address.is_default = false;
        }
    }
}

#[async_trait]
impl OrderLedger for MemoryStores {
    async fn create(&self, draft: OrderDraft) -> Result<Order, CheckoutError> {
        let mut state = self.write();

        if draft.lines.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }

        // Validate every line before committing any decrement.
        for line in &draft.lines {
            let product = state
                .products
                .get(&line.product_id.as_i32())
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;
            if product.stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    title: product.title.clone(),
                    available: product.stock,
                });
            }
        }

        for line in &draft.lines {
            if let Some(product) = state.products.get_mut(&line.product_id.as_i32()) {
                product.stock -= line.quantity;
            }
        }

        state.next_order += 1;
        let order = Order {
            id: OrderId::new(state.next_order),
            user_id: draft.user_id,
            lines: draft.lines,
            shipping_address: draft.shipping_address,
            payment_method: draft.payment_method,
            totals: draft.totals,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        state.orders.insert(order.id.as_i32(), order.clone());
        state.carts.remove(&order.user_id);
        Ok(order)
    }

    async fn cancel(&self, id: OrderId) -> Result<Order, CancelError> {
        let mut state = self.write();
        let status = state
            .orders
            .get(&id.as_i32())
            .map(|order| order.status)
            .ok_or(CancelError::NotFound)?;
        if !status.can_cancel() {
            return Err(CancelError::InvalidTransition(status));
        }

        let lines = state
            .orders
            .get(&id.as_i32())
            .map(|order| order.lines.clone())
            .unwrap_or_default();
        for line in &lines {
            // A product deleted since the order was placed has no counter to
            // restore.
            if let Some(product) = state.products.get_mut(&line.product_id.as_i32()) {
                product.stock += line.quantity;
            }
        }

        let order = state
            .orders
            .get_mut(&id.as_i32())
            .expect("order present under lock");
        order.status = OrderStatus::Cancelled;
        Ok(order.clone())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.read().orders.get(&id.as_i32()).cloned())
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .read()
            .orders
            .values()
            .rev()
            .filter(|order| order.user_id == user)
            .cloned()
            .collect())
    }
}
