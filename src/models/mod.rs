//! Wire models exchanged with the event backend.
//!
//! The backend owns these resources; the client only ever holds transient,
//! possibly stale copies.

pub mod event;
pub mod payment;
pub mod user;

pub use event::*;
pub use payment::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
