//! Stripe REST API client.

use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use super::error::StripeError;
use super::types::{CheckoutSession, CreatedSession, LineItem, List, NewCheckoutSession};
use crate::config::StripeConfig;

/// Page size for line-item listing (Stripe's maximum).
const LINE_ITEMS_PAGE_SIZE: &str = "100";

/// Stripe API client for Checkout Sessions.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
        }
    }

    /// Create a hosted Checkout Session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, Stripe rejects it, or the created
    /// session has no payment page URL.
    #[instrument(skip(self, params), fields(items = params.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        params: &NewCheckoutSession,
    ) -> Result<CreatedSession, StripeError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&params.to_form())
            .send()
            .await
            .map_err(|e| StripeError::Request(e.to_string()))?;

        let session: CheckoutSession = parse_response(response).await?;
        let url = session.url.ok_or_else(|| {
            StripeError::Response(format!("session {} has no payment page url", session.id))
        })?;

        debug!(session_id = %session.id, "Checkout session created");

        Ok(CreatedSession {
            id: session.id,
            url,
        })
    }

    /// List every line item of a session with products expanded.
    ///
    /// # Errors
    ///
    /// Returns error if any page request fails or cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError> {
        let url = format!(
            "{}/v1/checkout/sessions/{session_id}/line_items",
            self.api_base
        );
        let mut items = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut page_url =
                url::Url::parse(&url).map_err(|e| StripeError::Request(e.to_string()))?;
            {
                let mut query = page_url.query_pairs_mut();
                query
                    .append_pair("limit", LINE_ITEMS_PAGE_SIZE)
                    .append_pair("expand[]", "data.price.product");
                if let Some(cursor) = &starting_after {
                    query.append_pair("starting_after", cursor);
                }
            }

            let response = self
                .client
                .get(page_url)
                .bearer_auth(self.secret_key.expose_secret())
                .send()
                .await
                .map_err(|e| StripeError::Request(e.to_string()))?;

            let page: List<LineItem> = parse_response(response).await?;
            let has_more = page.has_more;
            starting_after = page.data.last().map(|item| item.id.clone());
            items.extend(page.data);

            if !has_more || starting_after.is_none() {
                break;
            }
        }

        debug!(count = items.len(), "Fetched session line items");
        Ok(items)
    }
}

/// Decode a success body, or turn Stripe's error envelope into [`StripeError::Api`].
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, StripeError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| StripeError::Response(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body).map_or_else(
        |_| body.clone(),
        |envelope| {
            let kind = envelope.error.kind.unwrap_or_default();
            let message = envelope.error.message.unwrap_or_default();
            format!("{kind}: {message}")
        },
    );

    error!(status = status.as_u16(), %message, "Stripe API error");
    Err(StripeError::Api {
        status: status.as_u16(),
        message,
    })
}
