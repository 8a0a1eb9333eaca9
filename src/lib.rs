pub mod app;
pub mod config;
pub mod domain;
pub mod efetch;
pub mod error;
pub mod ids;
pub mod output;
pub mod retry;
pub mod search;
pub mod store;
pub mod tui;
