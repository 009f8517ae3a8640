// Scripted mail service shared by the integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use recipient_export::mail_api::{MailApi, MailConnector, MessageHeader};
use recipient_export::step_logger::{LogEntry, StepStatus};

type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// Counters shared between a test and the fake service
#[derive(Clone, Default)]
pub struct Probe {
    connects: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
    header_calls: Arc<Mutex<Vec<String>>>,
}

impl Probe {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn header_calls(&self) -> Vec<String> {
        self.header_calls.lock().unwrap().clone()
    }
}

#[derive(Clone)]
pub struct FakeMessage {
    pub id: String,
    pub headers: Vec<MessageHeader>,
    pub fail: bool,
}

pub fn message(id: &str, headers: &[(&str, &str)]) -> FakeMessage {
    FakeMessage {
        id: id.to_string(),
        headers: headers
            .iter()
            .map(|(name, value)| MessageHeader::new(*name, *value))
            .collect(),
        fail: false,
    }
}

pub fn broken_message(id: &str) -> FakeMessage {
    FakeMessage {
        id: id.to_string(),
        headers: Vec::new(),
        fail: true,
    }
}

#[derive(Clone)]
pub struct FakeMailbox {
    messages: Vec<FakeMessage>,
    probe: Probe,
    on_headers: Option<Hook>,
}

impl MailApi for FakeMailbox {
    fn list_message_ids<'a>(&'a self, query: &'a str, limit: u32) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(async move {
            self.probe.queries.lock().unwrap().push(query.to_string());
            Ok(self
                .messages
                .iter()
                .take(limit as usize)
                .map(|m| m.id.clone())
                .collect())
        })
    }

    fn message_headers<'a>(&'a self, message_id: &'a str) -> BoxFuture<'a, Result<Vec<MessageHeader>>> {
        Box::pin(async move {
            self.probe
                .header_calls
                .lock()
                .unwrap()
                .push(message_id.to_string());
            if let Some(hook) = &self.on_headers {
                hook(message_id);
            }

            let message = self
                .messages
                .iter()
                .find(|m| m.id == message_id)
                .ok_or_else(|| anyhow!("404 message {} not found", message_id))?;
            if message.fail {
                return Err(anyhow!("500 backend error"));
            }
            Ok(message.headers.clone())
        })
    }
}

/// Connector that fails a fixed number of times before handing out the mailbox
pub struct FakeConnector {
    failures: usize,
    mailbox: FakeMailbox,
    probe: Probe,
}

impl FakeConnector {
    pub fn new(messages: Vec<FakeMessage>) -> Self {
        let probe = Probe::default();
        FakeConnector {
            failures: 0,
            mailbox: FakeMailbox {
                messages,
                probe: probe.clone(),
                on_headers: None,
            },
            probe,
        }
    }

    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    pub fn always_failing(self) -> Self {
        self.failing_first(usize::MAX)
    }

    /// Run `hook` with the message id at the start of every header fetch
    pub fn on_headers<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.mailbox.on_headers = Some(Arc::new(hook));
        self
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl MailConnector for FakeConnector {
    type Api = FakeMailbox;

    fn connect(&self) -> BoxFuture<'_, Result<FakeMailbox>> {
        Box::pin(async move {
            let attempt = self.probe.connects.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(anyhow!("invalid_grant: token has been expired or revoked"));
            }
            Ok(self.mailbox.clone())
        })
    }

    fn auth_label(&self) -> &str {
        "Fake Auth"
    }

    fn api_label(&self) -> &str {
        "Fake API"
    }
}

pub fn statuses_of<'a>(entries: &'a [LogEntry], step: &str) -> Vec<&'a StepStatus> {
    entries
        .iter()
        .filter(|e| e.step == step)
        .map(|e| &e.status)
        .collect()
}

pub fn newsletter_mailbox() -> Vec<FakeMessage> {
    vec![
        message(
            "m1",
            &[
                ("From", "newsletter@example.com"),
                ("To", "Alice@Example.com, bob@x.com"),
            ],
        ),
        message(
            "m2",
            &[
                ("From", "newsletter@example.com"),
                ("Cc", "bob@x.com, carol@y.org"),
            ],
        ),
    ]
}
