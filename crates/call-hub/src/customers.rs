//! Customer directory backing the lookup API.
//!
//! The pipeline only ever reads from the directory; creation is recognized
//! at the API surface but intentionally unsupported by this backing store.

use callpop_call_events::Customer;

/// Read-side view of the customer store.
pub trait CustomerDirectory: Send + Sync {
    /// Find the record registered for `phone`, if any.
    fn get_by_phone(&self, phone: &str) -> Option<Customer>;

    /// All known records.
    fn get_all(&self) -> Vec<Customer>;
}

/// Seeded in-memory directory.
pub struct InMemoryCustomerDirectory {
    customers: Vec<Customer>,
}

impl InMemoryCustomerDirectory {
    /// Directory pre-loaded with the demo customer base.
    pub fn seeded() -> Self {
        Self {
            customers: vec![
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
                Customer {
                    id: "4".to_string(),
                    name: "Trinity College Dublin".to_string(),
                    phone: "+35318961000".to_string(),
                    email: Some("procurement@tcd.ie".to_string()),
                    account_id: Some("ACC-003".to_string()),
                    notes: Some("Educational institution, bulk services".to_string()),
                },
                Customer {
                    id: "5".to_string(),
                    name: "Guinness Storehouse".to_string(),
                    phone: "+353014084800".to_string(),
                    email: Some("info@guinness-storehouse.com".to_string()),
                    account_id: Some("ACC-004".to_string()),
                    notes: Some("Tourism sector client".to_string()),
                },
            ],
        }
    }

    /// Empty directory, mainly for tests.
    pub fn empty() -> Self {
        Self { customers: Vec::new() }
    }
}

impl CustomerDirectory for InMemoryCustomerDirectory {
    fn get_by_phone(&self, phone: &str) -> Option<Customer> {
        self.customers.iter().find(|c| c.phone == phone).cloned()
    }

    fn get_all(&self) -> Vec<Customer> {
        self.customers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_seeded_customer_by_phone() {
        let directory = InMemoryCustomerDirectory::seeded();
        let customer = directory.get_by_phone("+353851234567").unwrap();
        assert_eq!(customer.name, "Dublin Tech Solutions Ltd");
        assert_eq!(customer.account_id.as_deref(), Some("ACC-001"));
    }

    #[test]
    fn unknown_phone_is_not_found() {
        let directory = InMemoryCustomerDirectory::seeded();
        assert!(directory.get_by_phone("+000").is_none());
    }

    #[test]
    fn lists_all_records() {
        let directory = InMemoryCustomerDirectory::seeded();
        assert_eq!(directory.get_all().len(), 5);
    }
}
