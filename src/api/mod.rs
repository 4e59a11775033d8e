//! HTTP client for the event backend.
//!
//! One method per backend operation. Each builds a single request against the
//! configured base address, attaches the current session token as a bearer
//! credential and maps the response. No state is kept here; caching and
//! coalescing live in [`crate::query`].

pub mod error;
pub mod validation;

pub use error::{
    CheckoutStep, ClientError, ErrorCode, ErrorInfo, ValidationErrorBuilder, ValidationErrors,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::auth::AuthStore;
use crate::config::ApiConfig;
use crate::models::{
    Event, EventCategory, EventUpdate, LoginRequest, LoginResponse, NewEvent, PaymentDetails,
    RatingRequest,
};

/// Backend operations the query layer depends on.
#[async_trait]
pub trait EventsBackend: Send + Sync {
    async fn list_all_events(&self) -> Result<Vec<Event>, ClientError>;
    /// Events organized by the current (admin) user
    async fn list_organized_events(&self) -> Result<Vec<Event>, ClientError>;
    /// Events booked by the current (member) user
    async fn list_booked_events(&self) -> Result<Vec<Event>, ClientError>;
    async fn get_event(&self, id: &str) -> Result<Event, ClientError>;
    async fn create_event(&self, event: &NewEvent) -> Result<Event, ClientError>;
    async fn update_event(&self, event: &EventUpdate) -> Result<Event, ClientError>;
    async fn delete_event(&self, id: &str) -> Result<(), ClientError>;
    async fn rate_event(&self, id: &str, rating: u8) -> Result<(), ClientError>;
    async fn book_event(&self, id: &str) -> Result<(), ClientError>;
    async fn verify_payment(&self, payment: &PaymentDetails) -> Result<(), ClientError>;
    async fn search_events(&self, keyword: &str) -> Result<Vec<Event>, ClientError>;
    async fn events_by_category(&self, category: EventCategory) -> Result<Vec<Event>, ClientError>;
    async fn events_by_city(&self, city: &str) -> Result<Vec<Event>, ClientError>;
    async fn events_after(&self, date: NaiveDate) -> Result<Vec<Event>, ClientError>;
}

/// reqwest-backed implementation of [`EventsBackend`].
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    base: Url,
    auth: Arc<AuthStore>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, auth: Arc<AuthStore>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|e| {
            ClientError::Transport(format!("Invalid API base URL {}: {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Transport(format!(
                "Invalid API base URL {}: not a hierarchical URL",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            base,
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve path segments against the base address.
    ///
    /// Each segment is percent-encoded on its own, so an id containing `/` or
    /// `?` stays a single segment. Empty and dot segments are rejected because
    /// they would address a different resource.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ClientError::Transport(format!("Invalid API base URL {}", self.base_url))
            })?;
            path.pop_if_empty();
            for segment in segments {
                if matches!(*segment, "" | "." | "..") {
                    return Err(ClientError::validation_field(
                        "id",
                        format!("Invalid path segment {:?}", segment),
                    ));
                }
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Start a request, attaching the session token when there is one.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let builder = self.client.request(method, self.endpoint(segments)?);
        Ok(match self.auth.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let request = builder.build()?;
        debug!(method = %request.method(), url = %request.url(), "Sending request");

        let response = self.client.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body
        };

        debug!(status = status.as_u16(), "Request rejected");
        Err(ClientError::Http {
            code: ErrorCode::from_status(status),
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Send a request whose response body carries nothing the client needs.
    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        let response = self.send(builder).await?;
        // Drain so the connection can be reused
        let _ = response.bytes().await;
        Ok(())
    }

    /// Exchange credentials for a session token at `POST /auth/login`.
    ///
    /// The token is returned, not adopted; pass it to [`AuthStore::login`].
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .send_json(self.client.post(self.endpoint(&["auth", "login"])?).json(&body))
            .await?;
        Ok(response.access_token)
    }
}

#[async_trait]
impl EventsBackend for ApiClient {
    async fn list_all_events(&self) -> Result<Vec<Event>, ClientError> {
        self.send_json(self.request(Method::GET, &["events", "all"])?)
            .await
    }

    async fn list_organized_events(&self) -> Result<Vec<Event>, ClientError> {
        self.send_json(self.request(Method::GET, &["events", "organizer"])?)
            .await
    }

    async fn list_booked_events(&self) -> Result<Vec<Event>, ClientError> {
        self.send_json(self.request(Method::GET, &["events", "bookings"])?)
            .await
    }

    async fn get_event(&self, id: &str) -> Result<Event, ClientError> {
        self.send_json(self.request(Method::GET, &["events", id])?)
            .await
    }

    async fn create_event(&self, event: &NewEvent) -> Result<Event, ClientError> {
        self.send_json(self.request(Method::POST, &["events"])?.json(event))
            .await
    }

    async fn update_event(&self, event: &EventUpdate) -> Result<Event, ClientError> {
        self.send_json(self.request(Method::PUT, &["events", "update"])?.json(event))
            .await
    }

    async fn delete_event(&self, id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &["events", id])?)
            .await
    }

    async fn rate_event(&self, id: &str, rating: u8) -> Result<(), ClientError> {
        self.send_empty(
            self.request(Method::POST, &["events", id, "rate"])?
                .json(&RatingRequest { rating }),
        )
        .await
    }

    async fn book_event(&self, id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::POST, &["events", id, "book"])?)
            .await
    }

    async fn verify_payment(&self, payment: &PaymentDetails) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::POST, &["payment", "verify"])?.json(payment))
            .await
    }

    async fn search_events(&self, keyword: &str) -> Result<Vec<Event>, ClientError> {
        self.send_json(
            self.request(Method::GET, &["events", "search"])?
                .query(&[("keyword", keyword)]),
        )
        .await
    }

    async fn events_by_category(&self, category: EventCategory) -> Result<Vec<Event>, ClientError> {
        let category = category.to_string();
        self.send_json(self.request(Method::GET, &["events", "category", &category])?)
            .await
    }

    async fn events_by_city(&self, city: &str) -> Result<Vec<Event>, ClientError> {
        self.send_json(self.request(Method::GET, &["events", "city", city])?)
            .await
    }

    async fn events_after(&self, date: NaiveDate) -> Result<Vec<Event>, ClientError> {
        let date = date.format("%Y-%m-%d").to_string();
        self.send_json(
            self.request(Method::GET, &["events", "date"])?
                .query(&[("date", date.as_str())]),
        )
        .await
    }
}
