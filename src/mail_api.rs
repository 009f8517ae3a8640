//! Seam between the extractor and the hosted mail service.
//!
//! The extractor only needs two calls: a message search by query with a
//! result cap, and a header-only fetch by message id. Connecting (which
//! includes authentication) is a separate step so it can be retried.

use anyhow::Result;
use futures::future::BoxFuture;

/// Header name/value pair as returned by the mail service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        MessageHeader {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Build a header from optional API fields, dropping incomplete pairs
    pub fn from_parts(name: Option<String>, value: Option<String>) -> Option<Self> {
        match (name, value) {
            (Some(name), Some(value)) => Some(MessageHeader { name, value }),
            _ => None,
        }
    }
}

/// Authenticated access to a mailbox
pub trait MailApi: Send + Sync {
    /// Ids of messages matching `query`, at most `limit` of them
    fn list_message_ids<'a>(&'a self, query: &'a str, limit: u32) -> BoxFuture<'a, Result<Vec<String>>>;

    /// Metadata headers of one message (no body)
    fn message_headers<'a>(&'a self, message_id: &'a str) -> BoxFuture<'a, Result<Vec<MessageHeader>>>;
}

/// Produces an authenticated [`MailApi`]; a single call is one authentication attempt
pub trait MailConnector: Send + Sync {
    type Api: MailApi;

    fn connect(&self) -> BoxFuture<'_, Result<Self::Api>>;

    /// Label shown in the step log for authentication steps
    fn auth_label(&self) -> &str {
        "Mail Auth"
    }

    /// Label shown in the step log for API calls
    fn api_label(&self) -> &str {
        "Mail API"
    }
}
