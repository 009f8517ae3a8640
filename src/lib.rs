// Library exports for recipient-export crate
// This allows tests and the binary to use the modules

pub mod config;
pub mod export;
pub mod extractor;
pub mod gmail_client;
pub mod mail_api;
pub mod orchestrator;
pub mod recipients;
pub mod run_context;
pub mod step_logger;

// Terminal surface (table rendering, keyboard controls)
pub mod ui;
