//! Client for services fronted by the caaspay API.

pub mod client;

pub use client::{ApiError, CaaspayClient, Credentials};
