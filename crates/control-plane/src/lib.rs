//! Client for the collector control plane.
//!
//! The control plane stores, per agent, named "sinks": broker addresses,
//! topic and consumer credentials. This crate exchanges user credentials for
//! a bearer token and fetches sink names and sink configurations.
//!
//! # Endpoints
//!
//! - `POST /auth/token` (HTTP Basic) returns a JSON string token
//! - `GET /collectors/{agent_id}/sinks` returns a JSON array of sink names
//! - `GET /collectors/{agent_id}/sinks/{sink_name}` returns a sink object
//!
//! Every call except the token exchange sends `Authorization: Bearer <token>`.
//! Any status above 206 is an error. Nothing is retried.

pub mod client;
pub mod error;
pub mod sink;

pub use client::{Client, Credential};
pub use error::{Error, Result};
pub use sink::{SinkConfig, SinkCredentials};

// Re-exported so callers of `call_api` do not need their own reqwest dependency.
pub use reqwest::Method;
