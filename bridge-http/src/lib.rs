//! # HTTP Transport
//!
//! Reqwest-backed implementation of the `HttpClient` seam from
//! `bridge-traits`. Connection pooling and TLS come from reqwest; retry
//! policy is a connector concern and lives in the provider crates.

pub mod http;

pub use http::ReqwestHttpClient;
