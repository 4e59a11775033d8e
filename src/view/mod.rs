//! What a viewer may see and do for an event.

pub mod currency;

pub use currency::{format_currency, included_tax, CurrencyFormat};

use crate::api::validation::MAX_RATING;
use crate::auth::Session;
use crate::config::DisplayConfig;
use crate::models::Event;

/// Controls shown on an event card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventActions {
    /// Members rate events
    pub can_rate: bool,
    /// Admins edit and delete events
    pub can_edit: bool,
    pub can_delete: bool,
}

impl EventActions {
    pub fn for_viewer(session: &Session) -> Self {
        Self {
            can_rate: session.is_member(),
            can_edit: session.is_admin(),
            can_delete: session.is_admin(),
        }
    }
}

pub fn can_create_events(session: &Session) -> bool {
    session.is_admin()
}

pub const BOOKED_LABEL: &str = "BOOKED";
pub const BUY_TICKET_LABEL: &str = "BUY TICKET";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingAction {
    pub label: &'static str,
    pub enabled: bool,
}

/// Booking button for `event`: disabled once the viewer holds a booking.
pub fn booking_action(session: &Session, event: &Event) -> BookingAction {
    let booked = session.user_id().is_some_and(|id| event.is_booked_by(id));
    if booked {
        BookingAction {
            label: BOOKED_LABEL,
            enabled: false,
        }
    } else {
        BookingAction {
            label: BUY_TICKET_LABEL,
            enabled: true,
        }
    }
}

/// Filled stars for an average rating, out of [`MAX_RATING`].
pub fn rating_stars(average_rating: f64) -> u8 {
    if !average_rating.is_finite() || average_rating <= 0.0 {
        return 0;
    }
    average_rating.round().min(MAX_RATING as f64) as u8
}

/// e.g. `★★★★☆`
pub fn render_stars(average_rating: f64) -> String {
    let filled = rating_stars(average_rating) as usize;
    let empty = MAX_RATING as usize - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

/// Price lines shown before paying for a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub price: String,
    pub included_tax: String,
}

pub fn checkout_summary(event: &Event, display: &DisplayConfig) -> CheckoutSummary {
    let format = CurrencyFormat::from(display);
    CheckoutSummary {
        price: format.format(event.price),
        included_tax: format.format(included_tax(event.price, display.tax_rate_percent)),
    }
}
