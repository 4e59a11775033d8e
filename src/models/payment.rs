//! Payment verification payload.

use serde::{Deserialize, Serialize};

/// Card details submitted to `POST /payment/verify`.
///
/// Verification itself is done by an external processor behind the backend;
/// the client only validates the shape before submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub full_name: String,
    pub card_number: String,
    /// Expiration date as printed on the card, `YY/MM`
    pub expiration_date: String,
    pub cvv: String,
}

impl PaymentDetails {
    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            card_number: self.card_number.trim().to_string(),
            expiration_date: self.expiration_date.trim().to_string(),
            cvv: self.cvv.trim().to_string(),
        }
    }

    /// Card number with all but the last four digits hidden.
    pub fn masked_card_number(&self) -> String {
        let digits: Vec<char> = self.card_number.chars().collect();
        let visible = digits.len().saturating_sub(4);
        digits
            .iter()
            .enumerate()
            .map(|(i, c)| if i < visible { '*' } else { *c })
            .collect()
    }
}
