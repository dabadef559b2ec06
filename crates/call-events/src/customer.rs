//! The identity record an incoming call is enriched with.

use serde::{Deserialize, Serialize};

/// A known-party record keyed by phone number.
///
/// Owned by the customer directory; the notification pipeline treats it as
/// read-only. Serialized camelCase to match the directory API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub account_id: Option<String>,
    pub notes: Option<String>,
}

impl Customer {
    /// Minimal constructor for records without the optional fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: phone.into(),
            email: None,
            account_id: None,
            notes: None,
        }
    }
}
