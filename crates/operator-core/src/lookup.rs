//! Customer lookup with graceful degradation.
//!
//! The directory service is an external collaborator and may be down; the
//! operator never sees that as a hard failure. Lookups that miss or fail
//! fall back to a small local table, and past that to "no customer info".

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use callpop_call_events::Customer;

use crate::error::OperatorResult;

/// Resolves a caller number to a customer record, absorbing failures.
///
/// Implementations must never error: the degradation policy (fallback data,
/// then nothing) is part of resolving.
#[async_trait]
pub trait CustomerResolver: Send + Sync {
    async fn resolve(&self, phone: &str) -> Option<Customer>;
}

/// HTTP client for the hub's customer directory.
pub struct CustomerLookup {
    base_url: String,
    http: reqwest::Client,
}

impl CustomerLookup {
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            base_url: server_addr.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Query the directory. `Ok(None)` is a clean miss (404); transport and
    /// server errors are `Err` so callers can fall back.
    pub async fn get_by_phone(&self, phone: &str) -> OperatorResult<Option<Customer>> {
        let url = format!("{}/api/customers/by-phone", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("number", phone)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let customer = response.json::<Customer>().await?;
        Ok(Some(customer))
    }

    /// Local fallback records used when the directory cannot answer.
    pub fn fallback_customer(phone: &str) -> Option<Customer> {
        let records = [
            Customer {
                id: "1".to_string(),
                name: "Dublin Tech Solutions Ltd".to_string(),
                phone: "+353851234567".to_string(),
                email: Some("contact@dublintech.ie".to_string()),
                account_id: Some("ACC-001".to_string()),
                notes: Some("VIP client, priority support required".to_string()),
            },
            Customer {
                id: "2".to_string(),
                name: "Liam O'Connor".to_string(),
                phone: "+353861234567".to_string(),
                email: Some("liam.oconnor@gmail.com".to_string()),
                account_id: None,
                notes: Some("Regular customer since 2020".to_string()),
            },
            Customer {
                id: "3".to_string(),
                name: "Aoife Murphy".to_string(),
                phone: "+353871234567".to_string(),
                email: Some("aoife.murphy@example.ie".to_string()),
                account_id: Some("ACC-002".to_string()),
                notes: Some("New client from Cork".to_string()),
            },
        ];
        records.into_iter().find(|c| c.phone == phone)
    }
}

#[async_trait]
impl CustomerResolver for CustomerLookup {
    async fn resolve(&self, phone: &str) -> Option<Customer> {
        match self.get_by_phone(phone).await {
            Ok(Some(customer)) => {
                debug!(phone = %phone, name = %customer.name, "Customer resolved");
                Some(customer)
            }
            Ok(None) => {
                debug!(phone = %phone, "No directory match, trying fallback table");
                Self::fallback_customer(phone)
            }
            Err(e) => {
                warn!(phone = %phone, error = %e, "Customer lookup failed, trying fallback table");
                Self::fallback_customer(phone)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_table_hits_and_misses() {
        let hit = CustomerLookup::fallback_customer("+353851234567").unwrap();
        assert_eq!(hit.name, "Dublin Tech Solutions Ltd");
        assert!(CustomerLookup::fallback_customer("+000").is_none());
    }

    #[tokio::test]
    async fn unreachable_directory_degrades_to_fallback() {
        let lookup = CustomerLookup::new("http://127.0.0.1:9");
        // Transport error inside, fallback hit outside.
        let resolved = lookup.resolve("+353861234567").await.unwrap();
        assert_eq!(resolved.name, "Liam O'Connor");

        // Transport error and no fallback entry: quietly nothing.
        assert!(lookup.resolve("+15550001111").await.is_none());
    }
}
