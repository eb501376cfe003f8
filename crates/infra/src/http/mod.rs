//! HTTP plumbing shared by remote transports

pub mod client;

pub use client::{Delivery, HttpClient, HttpClientBuilder};
