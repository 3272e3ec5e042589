//! Payment gateway implementations.
//!
//! - [`PayPalGateway`]: `PayPal` Orders v2 over its REST API
//! - [`MockPaymentGateway`]: approves everything, for local development

use crate::config::PaymentConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use ticketbooth_core::gateway::{CaptureStatus, GatewayError, OrderRequest, PaymentGateway, PaymentOrder};
use tokio::sync::Mutex;

/// Tokens are refreshed this long before `PayPal` says they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    status: String,
}

/// `PayPal` Orders v2 gateway.
///
/// Authenticates with the client-credentials grant and caches the access
/// token until shortly before it expires.
pub struct PayPalGateway {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    currency: String,
    brand_name: String,
    frontend_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for PayPalGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalGateway")
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl PayPalGateway {
    /// Build a gateway from configuration.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotConfigured`] without client credentials, or if the
    /// HTTP client cannot be built.
    pub fn from_config(config: &PaymentConfig, frontend_url: &str) -> Result<Self, GatewayError> {
        let (Some(client_id), Some(client_secret)) =
            (config.paypal_client_id.clone(), config.paypal_client_secret.clone())
        else {
            return Err(GatewayError::NotConfigured(
                "PAYPAL_CLIENT_ID and PAYPAL_CLIENT_SECRET must be set".to_string(),
            ));
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: config.paypal_mode.api_base().to_string(),
            client_id,
            client_secret,
            currency: config.currency.clone(),
            brand_name: config.brand_name.clone(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    /// Point at another API host (sandbox proxies, tests)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let token: TokenResponse = response.json().await.map_err(invalid)?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        tracing::debug!(expires_in = token.expires_in, "PayPal access token refreshed");
        Ok(token.access_token)
    }

    fn order_body(&self, request: &OrderRequest) -> Value {
        let booking_id = request.booking_id.to_string();
        json!({
            "intent": "CAPTURE",
            "application_context": {
                "brand_name": self.brand_name,
                "landing_page": "BILLING",
                "user_action": "PAY_NOW",
                "return_url": format!("{}/payment/success?bookingId={booking_id}", self.frontend_url),
                "cancel_url": format!("{}/payment/cancel?bookingId={booking_id}", self.frontend_url),
            },
            "purchase_units": [{
                "reference_id": request.event_id.to_string(),
                "custom_id": booking_id,
                "description": request.description,
                "amount": {
                    "currency_code": self.currency,
                    "value": request.amount.to_decimal_string(),
                },
            }],
        })
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<PaymentOrder, GatewayError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.api_base))
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .json(&self.order_body(request))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let order: OrderResponse = response.json().await.map_err(invalid)?;
        let approval_url = approval_link(&order.links)
            .ok_or_else(|| GatewayError::InvalidResponse(format!("order {} has no approve link", order.id)))?;

        tracing::info!(
            booking_id = %request.booking_id,
            order_id = %order.id,
            amount = %request.amount.to_decimal_string(),
            "PayPal order created"
        );
        Ok(PaymentOrder {
            order_id: order.id,
            approval_url,
        })
    }

    async fn capture_order(&self, order_id: &str) -> Result<CaptureStatus, GatewayError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}/v2/checkout/orders/{order_id}/capture", self.api_base))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let capture: CaptureResponse = response.json().await.map_err(invalid)?;
        tracing::info!(order_id, status = %capture.status, "PayPal order captured");
        Ok(CaptureStatus::from_provider(&capture.status))
    }
}

fn approval_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|link| link.rel == "approve" || link.rel == "payer-action")
        .map(|link| link.href.clone())
}

#[allow(clippy::needless_pass_by_value)]
fn transport(error: reqwest::Error) -> GatewayError {
    GatewayError::Transport(error.to_string())
}

#[allow(clippy::needless_pass_by_value)]
fn invalid(error: reqwest::Error) -> GatewayError {
    GatewayError::InvalidResponse(error.to_string())
}

async fn rejected(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    tracing::error!(status, body = %message, "PayPal request rejected");
    GatewayError::Rejected { status, message }
}

/// Mock payment gateway (always approves, for development).
///
/// Orders point the payer straight at the frontend success page.
#[derive(Clone, Debug)]
pub struct MockPaymentGateway {
    frontend_url: String,
}

impl MockPaymentGateway {
    /// Creates a mock gateway returning to `frontend_url`
    #[must_use]
    pub fn new(frontend_url: &str) -> Self {
        Self {
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    /// Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(frontend_url: &str) -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new(frontend_url))
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<PaymentOrder, GatewayError> {
        let order_id = format!("MOCK-{}", uuid::Uuid::new_v4().simple());
        tracing::info!(
            booking_id = %request.booking_id,
            order_id = %order_id,
            amount = %request.amount.to_decimal_string(),
            "Mock order created"
        );
        Ok(PaymentOrder {
            approval_url: format!(
                "{}/payment/success?bookingId={}&token={order_id}",
                self.frontend_url, request.booking_id
            ),
            order_id,
        })
    }

    async fn capture_order(&self, order_id: &str) -> Result<CaptureStatus, GatewayError> {
        tracing::info!(order_id, "Mock order captured");
        Ok(CaptureStatus::Completed)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{GatewayKind, PayPalMode};
    use ticketbooth_core::types::{BookingId, EventId, Money};

    fn payment_config() -> PaymentConfig {
        PaymentConfig {
            gateway: GatewayKind::PayPal,
            paypal_client_id: Some("client".to_string()),
            paypal_client_secret: Some("secret".to_string()),
            paypal_mode: PayPalMode::Sandbox,
            currency: "USD".to_string(),
            brand_name: "Ticketbooth".to_string(),
        }
    }

    fn order_request() -> OrderRequest {
        OrderRequest {
            booking_id: BookingId::new(),
            event_id: EventId::new(),
            description: "Booking for Jazz Night".to_string(),
            amount: Money::from_cents(7_550),
        }
    }

    #[test]
    fn order_body_carries_booking_and_event() {
        let gateway = PayPalGateway::from_config(&payment_config(), "https://tickets.example.com/")
            .expect("configured");
        let request = order_request();
        let body = gateway.order_body(&request);

        assert_eq!(body["intent"], "CAPTURE");
        let unit = &body["purchase_units"][0];
        assert_eq!(unit["amount"]["value"], "75.50");
        assert_eq!(unit["amount"]["currency_code"], "USD");
        assert_eq!(unit["custom_id"], request.booking_id.to_string());
        assert_eq!(unit["reference_id"], request.event_id.to_string());
        assert_eq!(
            body["application_context"]["return_url"],
            format!("https://tickets.example.com/payment/success?bookingId={}", request.booking_id)
        );
        assert_eq!(
            body["application_context"]["cancel_url"],
            format!("https://tickets.example.com/payment/cancel?bookingId={}", request.booking_id)
        );
    }

    #[test]
    fn missing_credentials_are_not_configured() {
        let mut config = payment_config();
        config.paypal_client_secret = None;
        let err = PayPalGateway::from_config(&config, "http://localhost").expect_err("incomplete");
        assert!(matches!(err, GatewayError::NotConfigured(_)));
    }

    #[test]
    fn approve_link_is_selected() {
        let links = vec![
            Link {
                href: "https://api/self".to_string(),
                rel: "self".to_string(),
            },
            Link {
                href: "https://www.sandbox.paypal.com/checkoutnow?token=5O1".to_string(),
                rel: "approve".to_string(),
            },
        ];
        assert_eq!(
            approval_link(&links).as_deref(),
            Some("https://www.sandbox.paypal.com/checkoutnow?token=5O1")
        );
        assert_eq!(approval_link(&links[..1]), None);
    }

    #[tokio::test]
    async fn mock_gateway_approves() {
        let gateway = MockPaymentGateway::new("http://localhost:5173");
        let request = order_request();
        let order = gateway.create_order(&request).await.expect("order");
        assert!(order.order_id.starts_with("MOCK-"));
        assert!(order.approval_url.contains(&request.booking_id.to_string()));
        let status = gateway.capture_order(&order.order_id).await.expect("capture");
        assert!(status.is_success());
    }
}
