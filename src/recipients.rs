use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::mail_api::MessageHeader;

/// Headers whose values are scanned for recipient addresses
pub const RECIPIENT_HEADERS: [&str; 3] = ["To", "Cc", "Bcc"];

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("address pattern is a valid regex")
});

/// First address-shaped substring of `raw`, lower-cased
pub fn clean_address(raw: &str) -> Option<String> {
    ADDRESS_PATTERN
        .find(raw)
        .map(|m| m.as_str().to_lowercase())
}

/// One candidate per comma-separated part that contains an address
pub fn addresses_in_value(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter_map(clean_address)
}

pub fn is_recipient_header(name: &str) -> bool {
    RECIPIENT_HEADERS.contains(&name)
}

/// Distinct, normalized recipient addresses, kept in sorted order
#[derive(Debug, Default, Clone)]
pub struct RecipientSet {
    addresses: BTreeSet<String>,
}

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every address of the To/Cc/Bcc headers; returns how many were new
    pub fn add_headers(&mut self, headers: &[MessageHeader]) -> usize {
        let before = self.addresses.len();
        for header in headers.iter().filter(|h| is_recipient_header(&h.name)) {
            self.addresses.extend(addresses_in_value(&header.value));
        }
        self.addresses.len() - before
    }

    pub fn insert(&mut self, raw: &str) -> bool {
        match clean_address(raw) {
            Some(address) => self.addresses.insert(address),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn into_sorted_vec(self) -> Vec<String> {
        self.addresses.into_iter().collect()
    }
}
