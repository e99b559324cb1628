//! # Backend Module
//!
//! Everything that talks to a remote store lives here: the adapter contract,
//! the two concrete drivers, and the facade the slices call through. Exactly
//! one driver is selected from static configuration at construction time;
//! there is no runtime switching.

pub mod facade;
pub mod hosted;
pub mod rest;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use facade::Backend;
pub use hosted::HostedAdapter;
pub use rest::RestAdapter;
pub use traits::BackendAdapter;

use std::time::Duration;

/// Which driver a deployment uses. A compile/config-time choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The custom REST API.
    Rest,
    /// The hosted data platform (PostgREST-style).
    Hosted,
}

/// Static backend configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Base URL of the selected backend.
    pub base_url: String,
    /// Publishable API key; required by the hosted platform, ignored by REST.
    pub api_key: Option<String>,
    /// Upper bound on any single backend call before it is failed with a
    /// timeout-class error and rolled back.
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn rest(base_url: impl Into<String>) -> Self {
        BackendConfig {
            kind: BackendKind::Rest,
            base_url: base_url.into(),
            api_key: None,
            request_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn hosted(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        BackendConfig {
            kind: BackendKind::Hosted,
            base_url: base_url.into(),
            api_key: Some(api_key.into()),
            request_timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}
