//! Payment gateway client.
//!
//! The gateway is an opaque remote service: order creation returns a handle
//! used to open the hosted payment UI, and verification checks the signature
//! triple reported by the provider's success callback.

use crate::config::GatewayConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected the request: {status} {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in minor currency units (paise).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: serde_json::Value,
}

/// Opaque order handle returned by the gateway.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub customer_details: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct VerifyPaymentResponse {
    success: bool,
}

#[derive(Clone)]
pub struct PaymentGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl PaymentGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    async fn post<B: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, GatewayError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        let order: GatewayOrder = self.post("/orders", request).await?;
        tracing::info!(order_id = %order.id, amount = order.amount, "gateway order created");
        Ok(order)
    }

    /// Returns `Ok(true)` only when the gateway confirms the signature.
    pub async fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<bool, GatewayError> {
        let response: VerifyPaymentResponse = self.post("/payments/verify", request).await?;
        Ok(response.success)
    }
}
