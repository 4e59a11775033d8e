//! Input validation for forms submitted to the backend.
//!
//! Every check here runs before a request is built, so invalid input never
//! reaches the network. Single-field checks return `Result<(), String>`; the
//! form-level functions collect them with [`ValidationErrorBuilder`].

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ClientError, ValidationErrorBuilder};
use crate::models::{EventUpdate, NewEvent, PaymentDetails};

lazy_static! {
    /// Local time as entered in a time picker: HH:MM with optional :SS
    static ref TIME_REGEX: Regex = Regex::new(
        r"^([01][0-9]|2[0-3]):[0-5][0-9](:[0-5][0-9])?$"
    ).unwrap();

    /// Card number: exactly 16 ASCII digits
    static ref CARD_NUMBER_REGEX: Regex = Regex::new(r"^[0-9]{16}$").unwrap();

    /// Card verification value: exactly 3 ASCII digits
    static ref CVV_REGEX: Regex = Regex::new(r"^[0-9]{3}$").unwrap();
}

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Validate a required free-text field
pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    Ok(())
}

/// Validate a title (required, max 255 characters)
pub fn validate_title(title: &str) -> Result<(), String> {
    validate_required(title, "Title")?;
    if title.chars().count() > 255 {
        return Err("Title is too long (max 255 characters)".to_string());
    }
    Ok(())
}

/// Validate a description (required, max 1000 characters)
pub fn validate_description(description: &str) -> Result<(), String> {
    validate_required(description, "Description")?;
    if description.chars().count() > 1000 {
        return Err("Description is too long (max 1000 characters)".to_string());
    }
    Ok(())
}

/// Validate a start or end time
pub fn validate_time(time: &str, label: &str) -> Result<(), String> {
    if time.is_empty() {
        return Err(format!("{} is required", label));
    }
    if !TIME_REGEX.is_match(time) {
        return Err(format!("{} must be formatted as HH:MM", label));
    }
    Ok(())
}

/// Validate the maximum number of participants
pub fn validate_capacity(max_participants: u32) -> Result<(), String> {
    if max_participants < 1 {
        return Err("Maximum participants must be at least 1".to_string());
    }
    Ok(())
}

/// Validate a ticket price
pub fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() {
        return Err("Price must be a number".to_string());
    }
    if price < 0.0 {
        return Err("Price cannot be negative".to_string());
    }
    Ok(())
}

/// Validate a star rating
pub fn validate_rating(rating: u8) -> Result<(), String> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        ));
    }
    Ok(())
}

/// Validate a card number (already trimmed)
pub fn validate_card_number(card_number: &str) -> Result<(), String> {
    if card_number.chars().count() != 16 {
        return Err("Card number must be exactly 16 digits".to_string());
    }
    if !CARD_NUMBER_REGEX.is_match(card_number) {
        return Err("Card number must contain only digits".to_string());
    }
    Ok(())
}

/// Validate a CVV (exactly 3 digits)
pub fn validate_cvv(cvv: &str) -> Result<(), String> {
    if !CVV_REGEX.is_match(cvv) {
        return Err("CVV must be exactly 3 digits".to_string());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn check_event_fields(
    builder: &mut ValidationErrorBuilder,
    title: &str,
    description: &str,
    start_time: &str,
    end_time: &str,
    city: &str,
    location: &str,
    max_participants: u32,
    price: f64,
) {
    builder
        .check("title", validate_title(title))
        .check("description", validate_description(description))
        .check("startTime", validate_time(start_time, "Start time"))
        .check("endTime", validate_time(end_time, "End time"))
        .check("city", validate_required(city, "City"))
        .check("location", validate_required(location, "Location"))
        .check("maxParticipants", validate_capacity(max_participants))
        .check("price", validate_price(price));
}

/// Validate the create-event form
pub fn validate_new_event(event: &NewEvent) -> Result<(), ClientError> {
    let mut builder = ValidationErrorBuilder::new();
    check_event_fields(
        &mut builder,
        &event.title,
        &event.description,
        &event.start_time,
        &event.end_time,
        &event.city,
        &event.location,
        event.max_participants,
        event.price,
    );
    builder.finish()
}

/// Validate the edit-event form
pub fn validate_event_update(event: &EventUpdate) -> Result<(), ClientError> {
    let mut builder = ValidationErrorBuilder::new();
    builder.check("id", validate_required(&event.id, "Event id"));
    check_event_fields(
        &mut builder,
        &event.title,
        &event.description,
        &event.start_time,
        &event.end_time,
        &event.city,
        &event.location,
        event.max_participants,
        event.price,
    );
    builder.finish()
}

/// Validate the payment form. Fields are compared after trimming.
pub fn validate_payment(payment: &PaymentDetails) -> Result<(), ClientError> {
    let payment = payment.trimmed();
    let mut builder = ValidationErrorBuilder::new();
    builder
        .check("fullName", validate_required(&payment.full_name, "Full name"))
        .check("cardNumber", validate_card_number(&payment.card_number))
        .check(
            "expirationDate",
            validate_required(&payment.expiration_date, "Expiration date"),
        )
        .check("cvv", validate_cvv(&payment.cvv));
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventCategory;
    use chrono::NaiveDate;

    fn valid_event() -> NewEvent {
        NewEvent {
            title: "Jazz Night".to_string(),
            description: "Live quartet".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            start_time: "20:00".to_string(),
            end_time: "23:00".to_string(),
            city: "Oslo".to_string(),
            location: "Operahuset".to_string(),
            category: EventCategory::Concert,
            max_participants: 100,
            price: 19.99,
        }
    }

    fn valid_payment() -> PaymentDetails {
        PaymentDetails {
            full_name: "Ana Silva".to_string(),
            card_number: "1234567812345678".to_string(),
            expiration_date: "24/12".to_string(),
            cvv: "999".to_string(),
        }
    }

    #[test]
    fn test_validate_time() {
        assert!(validate_time("09:30", "Start time").is_ok());
        assert!(validate_time("23:59:59", "Start time").is_ok());
        assert!(validate_time("24:00", "Start time").is_err());
        assert!(validate_time("9:30", "Start time").is_err());
        assert!(validate_time("", "Start time").is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(0).is_err());
        for rating in 1..=5 {
            assert!(validate_rating(rating).is_ok());
        }
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_new_event() {
        assert!(validate_new_event(&valid_event()).is_ok());

        let mut event = valid_event();
        event.title = "   ".to_string();
        event.max_participants = 0;
        match validate_new_event(&event) {
            Err(ClientError::Validation(errors)) => {
                assert!(errors.field("title").is_some());
                assert!(errors.field("maxParticipants").is_some());
                assert!(errors.field("city").is_none());
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_event_update_requires_id() {
        let event = valid_event();
        let update = EventUpdate {
            id: String::new(),
            title: event.title,
            description: event.description,
            event_date: event.event_date,
            start_time: event.start_time,
            end_time: event.end_time,
            city: event.city,
            location: event.location,
            category: event.category,
            max_participants: event.max_participants,
            price: event.price,
        };
        match validate_event_update(&update) {
            Err(ClientError::Validation(errors)) => assert!(errors.field("id").is_some()),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_payment() {
        assert!(validate_payment(&valid_payment()).is_ok());

        let mut padded = valid_payment();
        padded.card_number = " 1234567812345678 ".to_string();
        assert!(validate_payment(&padded).is_ok());
    }

    #[test]
    fn test_validate_payment_rejects_bad_card() {
        for card in ["123456781234567", "12345678123456789", "1234-5678-1234-5"] {
            let mut payment = valid_payment();
            payment.card_number = card.to_string();
            match validate_payment(&payment) {
                Err(ClientError::Validation(errors)) => {
                    assert!(errors.field("cardNumber").is_some(), "card {}", card)
                }
                other => panic!("Expected validation error for {}, got {:?}", card, other),
            }
        }
    }

    #[test]
    fn test_non_ascii_digits_are_rejected() {
        let mut payment = valid_payment();
        payment.card_number = "١٢٣٤٥٦٧٨١٢٣٤٥٦٧٨".to_string();
        payment.cvv = "١٢٣".to_string();
        match validate_payment(&payment) {
            Err(ClientError::Validation(errors)) => {
                assert!(errors.field("cardNumber").is_some());
                assert!(errors.field("cvv").is_some());
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
        assert!(validate_time("٠٩:٣٠", "Start time").is_err());
    }

    #[test]
    fn test_validate_payment_rejects_bad_cvv_and_name() {
        let mut payment = valid_payment();
        payment.cvv = "12".to_string();
        payment.full_name = " ".to_string();
        match validate_payment(&payment) {
            Err(ClientError::Validation(errors)) => {
                assert!(errors.field("cvv").is_some());
                assert!(errors.field("fullName").is_some());
                assert_eq!(errors.len(), 2);
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }
}
