//! Poster Shop
//!
//! Direct-to-consumer poster storefront service.
//!
//! ## Features
//! - Poster catalog with seed reconciliation and admin CRUD
//! - Cart with size-aware line merging and derived totals
//! - View/click analytics with dashboard aggregations
//! - Size- and category-dependent pricing
//! - Checkout validation and hosted-payment orchestration

use std::collections::HashMap;
use thiserror::Error;

pub mod admin;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod payment;
pub mod pricing;
pub mod storage;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("poster not found")]
    PosterNotFound,

    #[error("cart is empty")]
    EmptyCart,

    #[error("order subtotal {subtotal} is below the minimum of {minimum}")]
    BelowMinimumOrder { subtotal: i64, minimum: i64 },

    #[error("validation failed")]
    Validation(HashMap<String, String>),

    #[error("unknown order")]
    UnknownOrder,

    #[error("payment was not verified")]
    PaymentDeclined,

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Gateway(#[from] payment::GatewayError),
}

pub type Result<T> = std::result::Result<T, ShopError>;
