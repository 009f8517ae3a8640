use anyhow::{Result, Context};
use futures::future::BoxFuture;
use google_gmail1::{Gmail, hyper, hyper_rustls, oauth2};
use google_gmail1::api::Scope;
use log::{info, debug};

use crate::config::GmailConfig;
use crate::mail_api::{MailApi, MailConnector, MessageHeader};
use crate::recipients::RECIPIENT_HEADERS;

/// Read-only access is enough: we only list messages and read headers
const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Gmail caps `maxResults` per page at 500
const MAX_PAGE_SIZE: u32 = 500;

type GmailHub = Gmail<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;

/// Collects message ids across result pages until `limit` is reached,
/// the last page is seen, or a page comes back empty
#[derive(Debug)]
struct IdPager {
    limit: u32,
    ids: Vec<String>,
    next_token: Option<String>,
    done: bool,
}

impl IdPager {
    fn new(limit: u32) -> Self {
        IdPager {
            limit,
            ids: Vec::new(),
            next_token: None,
            done: limit == 0,
        }
    }

    /// Page size and token of the next request, `None` once collection is over
    fn next_request(&self) -> Option<(u32, Option<String>)> {
        if self.done {
            return None;
        }
        let remaining = self.limit - self.ids.len() as u32;
        Some((remaining.min(MAX_PAGE_SIZE), self.next_token.clone()))
    }

    fn push_page(&mut self, page: Vec<String>, next_token: Option<String>) {
        let before = self.ids.len();
        self.ids.extend(page);
        self.ids.truncate(self.limit as usize);

        self.next_token = next_token;
        self.done = self.next_token.is_none()
            || self.ids.len() == before
            || self.ids.len() >= self.limit as usize;
    }

    fn into_ids(self) -> Vec<String> {
        self.ids
    }
}

pub struct GmailClient {
    hub: GmailHub,
}

impl GmailClient {
    pub async fn new(config: &GmailConfig) -> Result<Self> {
        info!("Connecting to Gmail API via OAuth2");

        // Read OAuth2 client credentials from file
        let secret = oauth2::read_application_secret(&config.credentials_path)
            .await
            .with_context(|| format!("Unable to read OAuth2 client credentials file '{}'", config.credentials_path))?;

        // Cached token is reused, refreshed when expired, or obtained through
        // the browser flow, and written back to the cache in every case
        let auth = oauth2::InstalledFlowAuthenticator::builder(
            secret,
            oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(&config.token_cache_path)
        .build()
        .await
        .context("Unable to create OAuth2 authenticator")?;

        // Force token acquisition now so failures surface as auth failures
        auth.token(&[GMAIL_READONLY_SCOPE])
            .await
            .context("Unable to obtain a valid OAuth2 access token")?;
        debug!("OAuth2 token available, cached in {}", config.token_cache_path);

        // Create HTTP client
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();

        let client = hyper::Client::builder().build(connector);

        let hub = Gmail::new(client, auth);

        info!("✅ Gmail API connection established successfully");

        Ok(GmailClient { hub })
    }

    /// Message ids matching a Gmail search query, following pages until
    /// `limit` ids are collected or the result set is exhausted
    pub async fn search_message_ids(&self, query: &str, limit: u32) -> Result<Vec<String>> {
        info!("Searching for emails matching '{}'", query);

        let user_id = "me";
        let mut pager = IdPager::new(limit);

        while let Some((page_size, page_token)) = pager.next_request() {
            let mut call = self.hub
                .users()
                .messages_list(user_id)
                .q(query)
                .max_results(page_size)
                .add_scope(Scope::Readonly);

            if let Some(token) = page_token.as_deref() {
                call = call.page_token(token);
            }

            let result = call
                .doit()
                .await
                .context("Error searching for emails")?;

            let page = result.1;
            let ids: Vec<String> = page.messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|msg| msg.id)
                .collect();
            debug!("Page returned {} message id(s)", ids.len());

            pager.push_page(ids, page.next_page_token);
        }

        let message_ids = pager.into_ids();
        info!("Found {} email(s) matching '{}'", message_ids.len(), query);

        Ok(message_ids)
    }

    /// Retrieve only the recipient headers of a message (METADATA format, no body)
    pub async fn fetch_recipient_headers(&self, message_id: &str) -> Result<Vec<MessageHeader>> {
        debug!("Retrieving email metadata for ID: {}", message_id);

        let user_id = "me";

        let mut call = self.hub
            .users()
            .messages_get(user_id, message_id)
            .format("metadata")
            .add_scope(Scope::Readonly);

        for header in RECIPIENT_HEADERS {
            call = call.add_metadata_headers(header);
        }

        let result = call
            .doit()
            .await
            .context("Unable to retrieve email metadata")?;

        let headers = result.1
            .payload
            .and_then(|payload| payload.headers)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|header| MessageHeader::from_parts(header.name, header.value))
            .collect();

        Ok(headers)
    }
}

impl MailApi for GmailClient {
    fn list_message_ids<'a>(&'a self, query: &'a str, limit: u32) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(self.search_message_ids(query, limit))
    }

    fn message_headers<'a>(&'a self, message_id: &'a str) -> BoxFuture<'a, Result<Vec<MessageHeader>>> {
        Box::pin(self.fetch_recipient_headers(message_id))
    }
}

/// Builds a fresh [`GmailClient`] on every authentication attempt
pub struct GmailConnector {
    config: GmailConfig,
}

impl GmailConnector {
    pub fn new(config: GmailConfig) -> Self {
        GmailConnector { config }
    }
}

impl MailConnector for GmailConnector {
    type Api = GmailClient;

    fn connect(&self) -> BoxFuture<'_, Result<GmailClient>> {
        Box::pin(GmailClient::new(&self.config))
    }

    fn auth_label(&self) -> &str {
        "Google Auth"
    }

    fn api_label(&self) -> &str {
        "Gmail API"
    }
}
