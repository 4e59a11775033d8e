//! Typed event reads and mutations over the shared [`QueryCache`].

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use super::{QueryCache, QueryState};
use crate::api::validation::{
    validate_event_update, validate_new_event, validate_payment, validate_rating,
};
use crate::api::{CheckoutStep, ClientError, EventsBackend};
use crate::auth::{AuthStore, Session};
use crate::models::{Event, EventCategory, EventPatch, EventUpdate, NewEvent, PaymentDetails, Role};

/// Cache key families for events.
pub mod keys {
    use super::EventFilter;
    use crate::models::Role;
    use crate::query::QueryKey;

    pub const EVENTS: &str = "events";
    pub const EVENT: &str = "event";

    /// Every list of events, whatever the viewer or filter.
    pub fn events_family() -> QueryKey {
        QueryKey::new(EVENTS)
    }

    /// `["events", role, by_user]`
    pub fn event_list(role: Option<Role>, by_user: bool) -> QueryKey {
        QueryKey::new(EVENTS)
            .with(role.map(|r| r.as_str()))
            .with(by_user)
    }

    /// `["events", "filter", kind, value]`
    pub fn filtered(filter: &EventFilter) -> QueryKey {
        let key = QueryKey::new(EVENTS).with("filter");
        match filter {
            EventFilter::Keyword(k) => key.with("keyword").with(k.as_str()),
            EventFilter::Category(c) => key.with("category").with(c.as_str()),
            EventFilter::City(c) => key.with("city").with(c.as_str()),
            EventFilter::After(d) => key.with("after").with(d.to_string()),
        }
    }

    /// `["event", id]`
    pub fn event(id: &str) -> QueryKey {
        QueryKey::new(EVENT).with(id)
    }
}

/// Discovery filters the backend supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    Keyword(String),
    Category(EventCategory),
    City(String),
    /// Events taking place after the date
    After(NaiveDate),
}

/// Event reads and mutations for the current session.
///
/// Reads go through the cache and are coalesced per key. Mutations check the
/// session's role and validate input before any request is made, and
/// invalidate affected keys only once the backend has accepted them.
pub struct EventStore {
    backend: Arc<dyn EventsBackend>,
    cache: Arc<QueryCache>,
    auth: Arc<AuthStore>,
}

impl EventStore {
    pub fn new(backend: Arc<dyn EventsBackend>, cache: Arc<QueryCache>, auth: Arc<AuthStore>) -> Self {
        Self {
            backend,
            cache,
            auth,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn session(&self) -> Arc<Session> {
        self.auth.session()
    }

    fn require_role(&self, required: Role) -> Result<Arc<Session>, ClientError> {
        let session = self.auth.session();
        match session.role() {
            None => Err(ClientError::Unauthenticated),
            Some(role) if role == required => Ok(session),
            Some(_) => Err(ClientError::Forbidden { required }),
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub async fn all_events(&self) -> QueryState<Vec<Event>> {
        let backend = self.backend.clone();
        self.cache
            .fetch(keys::event_list(self.auth.role(), false), move || async move {
                backend.list_all_events().await
            })
            .await
    }

    /// Events organized by an admin, or booked by a member.
    pub async fn my_events(&self) -> QueryState<Vec<Event>> {
        let role = match self.auth.role() {
            Some(role) => role,
            None => return QueryState::failed((&ClientError::Unauthenticated).into()),
        };

        let backend = self.backend.clone();
        self.cache
            .fetch(keys::event_list(Some(role), true), move || async move {
                match role {
                    Role::Admin => backend.list_organized_events().await,
                    Role::Member => backend.list_booked_events().await,
                }
            })
            .await
    }

    pub async fn event(&self, id: &str) -> QueryState<Event> {
        let backend = self.backend.clone();
        let owned = id.to_string();
        self.cache
            .fetch(keys::event(id), move || async move { backend.get_event(&owned).await })
            .await
    }

    pub async fn filtered(&self, filter: EventFilter) -> QueryState<Vec<Event>> {
        let backend = self.backend.clone();
        let key = keys::filtered(&filter);
        self.cache
            .fetch(key, move || async move {
                match filter {
                    EventFilter::Keyword(keyword) => backend.search_events(&keyword).await,
                    EventFilter::Category(category) => backend.events_by_category(category).await,
                    EventFilter::City(city) => backend.events_by_city(&city).await,
                    EventFilter::After(date) => backend.events_after(date).await,
                }
            })
            .await
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    fn invalidate_event(&self, id: &str) {
        self.cache.invalidate(&keys::events_family());
        self.cache.invalidate(&keys::event(id));
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<Event, ClientError> {
        self.require_role(Role::Admin)?;
        validate_new_event(event)?;

        let created = self.backend.create_event(event).await.map_err(|e| {
            warn!(title = %event.title, error = %e, "Failed to create event");
            e
        })?;

        info!(event_id = %created.id, title = %created.title, "Created event");
        self.cache.invalidate(&keys::events_family());
        Ok(created)
    }

    /// Load the event, overlay `patch` and send the full update.
    pub async fn update_event(&self, id: &str, patch: EventPatch) -> Result<Event, ClientError> {
        self.require_role(Role::Admin)?;
        if patch.is_empty() {
            return Err(ClientError::validation_field("event", "Nothing to update"));
        }

        let current = self.backend.get_event(id).await?;
        let mut update = EventUpdate::from(&current);
        patch.apply(&mut update);
        validate_event_update(&update)?;

        let updated = self.backend.update_event(&update).await.map_err(|e| {
            warn!(event_id = %id, error = %e, "Failed to update event");
            e
        })?;

        info!(event_id = %id, "Updated event");
        self.invalidate_event(id);
        Ok(updated)
    }

    pub async fn delete_event(&self, id: &str) -> Result<(), ClientError> {
        self.require_role(Role::Admin)?;

        self.backend.delete_event(id).await.map_err(|e| {
            warn!(event_id = %id, error = %e, "Failed to delete event");
            e
        })?;

        info!(event_id = %id, "Deleted event");
        self.invalidate_event(id);
        Ok(())
    }

    pub async fn rate_event(&self, id: &str, rating: u8) -> Result<(), ClientError> {
        self.require_role(Role::Member)?;
        validate_rating(rating).map_err(|m| ClientError::validation_field("rating", m))?;

        self.backend.rate_event(id, rating).await.map_err(|e| {
            warn!(event_id = %id, rating, error = %e, "Failed to rate event");
            e
        })?;

        info!(event_id = %id, rating, "Rated event");
        self.invalidate_event(id);
        Ok(())
    }

    pub async fn book_event(&self, id: &str) -> Result<(), ClientError> {
        self.require_role(Role::Member)?;

        self.backend.book_event(id).await.map_err(|e| {
            warn!(event_id = %id, error = %e, "Failed to book event");
            e
        })?;

        info!(event_id = %id, "Booked event");
        self.invalidate_event(id);
        Ok(())
    }

    pub async fn verify_payment(&self, payment: &PaymentDetails) -> Result<(), ClientError> {
        self.require_role(Role::Member)?;
        validate_payment(payment)?;

        self.backend.verify_payment(&payment.trimmed()).await.map_err(|e| {
            warn!(card = %payment.masked_card_number(), error = %e, "Payment verification failed");
            e
        })
    }

    /// Verify the payment, then book the event.
    ///
    /// The booking request is only sent after verification succeeds. A failure
    /// at either step is reported as one [`ClientError::Checkout`]; a verified
    /// payment is not reversed when booking fails.
    pub async fn checkout(&self, event_id: &str, payment: &PaymentDetails) -> Result<(), ClientError> {
        self.require_role(Role::Member)?;
        validate_payment(payment)?;

        if let Err(e) = self.verify_payment(payment).await {
            return Err(ClientError::Checkout {
                step: CheckoutStep::VerifyPayment,
                message: e.to_string(),
            });
        }

        if let Err(e) = self.book_event(event_id).await {
            warn!(event_id = %event_id, "Payment verified but booking failed");
            return Err(ClientError::Checkout {
                step: CheckoutStep::Book,
                message: e.to_string(),
            });
        }

        Ok(())
    }
}
