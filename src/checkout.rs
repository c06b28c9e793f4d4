//! Checkout validation and order orchestration.
//!
//! Two-step flow: `begin` validates the shipping form, applies the order
//! guards, quotes shipping and creates the remote gateway order; `complete`
//! verifies the provider's signature triple before the order is confirmed.
//! A declined payment leaves the pending order (and the caller's cart)
//! untouched so the customer can resubmit.

use crate::cart::CartStore;
use crate::payment::{CreateOrderRequest, GatewayOrder, PaymentGateway, VerifyPaymentRequest};
use crate::{ShopError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Carts below this subtotal cannot enter checkout.
pub const MINIMUM_ORDER_VALUE: i64 = 259;
/// Subtotals at or above this ship free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 499;
pub const FLAT_SHIPPING: i64 = 49;

pub const CURRENCY: &str = "INR";

pub fn shipping_cost(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuote {
    pub subtotal: i64,
    pub shipping: i64,
    pub total: i64,
}

pub fn quote(subtotal: i64) -> CheckoutQuote {
    let shipping = shipping_cost(subtotal);
    CheckoutQuote {
        subtotal,
        shipping,
        total: subtotal + shipping,
    }
}

/// What checkout needs to know about the cart, captured before any await.
#[derive(Clone, Copy, Debug)]
pub struct CartSummary {
    pub is_empty: bool,
    pub subtotal: i64,
}

impl CartSummary {
    pub fn of(cart: &CartStore) -> Self {
        Self {
            is_empty: cart.is_empty(),
            subtotal: cart.subtotal(),
        }
    }
}

fn validate_phone(phone: &str) -> std::result::Result<(), ValidationError> {
    if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }
    let mut err = ValidationError::new("phone");
    err.message = Some("phone number must be exactly 10 digits".into());
    Err(err)
}

fn validate_pincode(pincode: &str) -> std::result::Result<(), ValidationError> {
    if pincode.len() == 6 && pincode.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }
    let mut err = ValidationError::new("pincode");
    err.message = Some("pincode must be exactly 6 digits".into());
    Err(err)
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ShippingDetails {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(custom = "validate_pincode")]
    pub pincode: String,
}

/// Flatten validation failures into one message per field, in the shape the
/// checkout form renders next to each input.
pub fn field_errors(errors: &ValidationErrors) -> HashMap<String, String> {
    errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let message = errs
                .iter()
                .find_map(|e| e.message.clone())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{field} is invalid"));
            ((*field).to_string(), message)
        })
        .collect()
}

/// Everything the hosted payment UI needs to open.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub order_id: String,
    /// Amount in minor currency units, as the gateway echoes it.
    pub amount: i64,
    pub currency: String,
    pub quote: CheckoutQuote,
    pub prefill: ContactPrefill,
}

#[derive(Clone, Debug, Serialize)]
pub struct ContactPrefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// Signature triple from the provider's success callback.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub amount: i64,
    pub email: String,
}

struct PendingOrder {
    details: ShippingDetails,
    quote: CheckoutQuote,
    created_at: DateTime<Utc>,
}

pub struct CheckoutFlow {
    gateway: PaymentGateway,
    pending: Mutex<HashMap<String, PendingOrder>>,
}

impl CheckoutFlow {
    pub fn new(gateway: PaymentGateway) -> Self {
        Self {
            gateway,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Guard, validate, quote and create the remote order. The pending order
    /// stays registered until its payment verifies.
    pub async fn begin(
        &self,
        details: ShippingDetails,
        cart: CartSummary,
    ) -> Result<PaymentSession> {
        if cart.is_empty {
            return Err(ShopError::EmptyCart);
        }
        if cart.subtotal < MINIMUM_ORDER_VALUE {
            return Err(ShopError::BelowMinimumOrder {
                subtotal: cart.subtotal,
                minimum: MINIMUM_ORDER_VALUE,
            });
        }
        details
            .validate()
            .map_err(|e| ShopError::Validation(field_errors(&e)))?;

        let quote = quote(cart.subtotal);
        let order: GatewayOrder = self
            .gateway
            .create_order(&CreateOrderRequest {
                amount: quote.total * 100,
                currency: CURRENCY.to_string(),
                receipt: format!("rcpt_{}", Uuid::now_v7()),
                notes: serde_json::json!({
                    "address": details.address.clone(),
                    "city": details.city.clone(),
                    "state": details.state.clone(),
                    "pincode": details.pincode.clone(),
                }),
            })
            .await?;

        let session = PaymentSession {
            order_id: order.id.clone(),
            amount: order.amount,
            currency: order.currency,
            quote,
            prefill: ContactPrefill {
                name: details.name.clone(),
                email: details.email.clone(),
                contact: details.phone.clone(),
            },
        };
        self.lock_pending().insert(
            order.id,
            PendingOrder {
                details,
                quote,
                created_at: Utc::now(),
            },
        );
        Ok(session)
    }

    /// Verify the provider callback. Only a confirmed verification consumes
    /// the pending order; the caller clears the cart on success.
    pub async fn complete(&self, callback: PaymentCallback) -> Result<OrderConfirmation> {
        let (customer_details, quote) = {
            let pending = self.lock_pending();
            let order = pending
                .get(&callback.order_id)
                .ok_or(ShopError::UnknownOrder)?;
            (
                serde_json::to_value(&order.details).unwrap_or_default(),
                order.quote,
            )
        };

        let verified = self
            .gateway
            .verify_payment(&VerifyPaymentRequest {
                order_id: callback.order_id.clone(),
                payment_id: callback.payment_id.clone(),
                signature: callback.signature,
                customer_details,
            })
            .await?;
        if !verified {
            tracing::warn!(order_id = %callback.order_id, "payment verification failed");
            return Err(ShopError::PaymentDeclined);
        }

        let order = self
            .lock_pending()
            .remove(&callback.order_id)
            .ok_or(ShopError::UnknownOrder)?;
        tracing::info!(
            order_id = %callback.order_id,
            total = order.quote.total,
            waited = %(Utc::now() - order.created_at),
            "order confirmed"
        );
        Ok(OrderConfirmation {
            order_id: callback.order_id,
            payment_id: callback.payment_id,
            amount: quote.total,
            email: order.details.email,
        })
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingOrder>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn details() -> ShippingDetails {
        ShippingDetails {
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9876543210".to_string(),
            address: "14 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
        }
    }

    fn cart(subtotal: i64) -> CartSummary {
        CartSummary {
            is_empty: subtotal == 0,
            subtotal,
        }
    }

    async fn flow(server: &MockServer) -> CheckoutFlow {
        CheckoutFlow::new(PaymentGateway::new(&GatewayConfig {
            base_url: server.uri(),
            key_id: "key".to_string(),
            key_secret: "secret".to_string(),
        }))
    }

    async fn mount_gateway(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"id": "order_1", "amount": 30800, "currency": "INR"}),
            ))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/payments/verify"))
            .and(body_partial_json(serde_json::json!({"signature": "good"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/payments/verify"))
            .and(body_partial_json(serde_json::json!({"signature": "bad"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": false})))
            .mount(server)
            .await;
    }

    #[test]
    fn test_shipping_cost_boundary() {
        assert_eq!(shipping_cost(498), 49);
        assert_eq!(shipping_cost(499), 0);
        assert_eq!(quote(498).total, 547);
        assert_eq!(quote(499).total, 499);
    }

    #[test]
    fn test_field_validation() {
        let mut bad = details();
        bad.email = "not-an-email".to_string();
        bad.phone = "12345".to_string();
        bad.pincode = "56001".to_string();
        bad.city = String::new();
        let errors = field_errors(&bad.validate().unwrap_err());
        assert_eq!(errors["email"], "enter a valid email address");
        assert_eq!(errors["phone"], "phone number must be exactly 10 digits");
        assert_eq!(errors["pincode"], "pincode must be exactly 6 digits");
        assert_eq!(errors["city"], "city is required");
        assert!(!errors.contains_key("name"));
    }

    #[tokio::test]
    async fn test_minimum_order_boundary() {
        let server = MockServer::start().await;
        mount_gateway(&server).await;
        let flow = flow(&server).await;

        let err = flow.begin(details(), cart(258)).await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::BelowMinimumOrder { subtotal: 258, minimum: 259 }
        ));
        assert!(flow.begin(details(), cart(259)).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_before_the_gateway() {
        let server = MockServer::start().await;
        // No mocks mounted: a gateway call would fail loudly.
        let flow = flow(&server).await;
        let err = flow.begin(details(), cart(0)).await.unwrap_err();
        assert!(matches!(err, ShopError::EmptyCart));
    }

    #[tokio::test]
    async fn test_begin_quotes_and_opens_session() {
        let server = MockServer::start().await;
        mount_gateway(&server).await;
        let flow = flow(&server).await;

        let session = flow.begin(details(), cart(308)).await.unwrap();
        assert_eq!(session.order_id, "order_1");
        assert_eq!(session.quote.subtotal, 308);
        assert_eq!(session.quote.shipping, 49);
        assert_eq!(session.quote.total, 357);
        assert_eq!(session.prefill.contact, "9876543210");
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_order_recoverable() {
        let server = MockServer::start().await;
        mount_gateway(&server).await;
        let flow = flow(&server).await;

        let session = flow.begin(details(), cart(600)).await.unwrap();
        let callback = |signature: &str| PaymentCallback {
            order_id: session.order_id.clone(),
            payment_id: "pay_9".to_string(),
            signature: signature.to_string(),
        };

        let err = flow.complete(callback("bad")).await.unwrap_err();
        assert!(matches!(err, ShopError::PaymentDeclined));

        // The pending order survived the failure; resubmission succeeds.
        let confirmation = flow.complete(callback("good")).await.unwrap();
        assert_eq!(confirmation.order_id, session.order_id);
        assert_eq!(confirmation.amount, 600);
        assert_eq!(confirmation.email, "asha@example.com");

        // And the order is consumed: a replayed callback is unknown.
        let err = flow.complete(callback("good")).await.unwrap_err();
        assert!(matches!(err, ShopError::UnknownOrder));
    }

    #[tokio::test]
    async fn test_unknown_order_callback() {
        let server = MockServer::start().await;
        mount_gateway(&server).await;
        let flow = flow(&server).await;
        let err = flow
            .complete(PaymentCallback {
                order_id: "order_missing".to_string(),
                payment_id: "pay_1".to_string(),
                signature: "good".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::UnknownOrder));
    }
}
