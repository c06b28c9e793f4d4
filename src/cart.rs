//! Cart store.
//!
//! Line items are keyed by the composite `posterId-size` id, so the same
//! poster in two sizes occupies two lines while re-adding an identical
//! line merges into its quantity.

use crate::pricing::PosterSize;
use crate::storage::{JsonStore, CART_KEY};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub title: String,
    /// Unit price in whole rupees, resolved at add time.
    pub price: i64,
    pub category: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub size: Option<PosterSize>,
}

/// A line as it arrives from "add to cart" — no quantity yet.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub id: String,
    pub title: String,
    pub price: i64,
    pub category: String,
    pub image_url: Option<String>,
    pub size: Option<PosterSize>,
}

/// Uniqueness key for cart line merging.
pub fn composite_id(poster_id: &str, size: PosterSize) -> String {
    format!("{poster_id}-{size}")
}

pub struct CartStore {
    items: Vec<CartItem>,
    storage: JsonStore,
}

impl CartStore {
    pub fn load(storage: JsonStore) -> Self {
        let items = storage.get(CART_KEY).unwrap_or_default();
        Self { items, storage }
    }

    fn persist(&self) {
        self.storage.put(CART_KEY, &self.items);
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merge on an existing composite id, otherwise append with quantity 1.
    pub fn add(&mut self, line: NewCartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == line.id) {
            existing.quantity += 1;
        } else {
            self.items.push(CartItem {
                id: line.id,
                title: line.title,
                price: line.price,
                category: line.category,
                image_url: line.image_url,
                quantity: 1,
                size: line.size,
            });
        }
        self.persist();
    }

    pub fn remove(&mut self, id: &str) {
        self.items.retain(|i| i.id != id);
        self.persist();
    }

    /// Quantities of zero or below remove the line.
    pub fn set_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove(id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.quantity = quantity as u32;
        }
        self.persist();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> i64 {
        self.items.iter().map(|i| i.price * i64::from(i.quantity)).sum()
    }
}
