//! Session gates
//!
//! A gate inspects a freshly navigated page for authentication problems. An
//! [`AuthError`] is fatal for the whole batch: the session is not usable and
//! retrying other targets with it would only repeat the failure.

use crate::browser::{Browser, Scope};
use crate::extract::Selector;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Authentication failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Login required at {url} (found {indicator})")]
    LoginRequired { url: String, indicator: String },

    #[error("Security checkpoint at {url}: {signal}")]
    Checkpoint { url: String, signal: String },
}

/// Checks that the page belongs to a usable session
#[async_trait]
pub trait SessionGate: Send + Sync {
    /// Inspects `page` after navigation
    async fn prepare<B: Browser>(&self, page: &mut B) -> Result<(), AuthError>;
}

/// Gate for guest runs: no session, nothing to check
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestGate;

#[async_trait]
impl SessionGate for GuestGate {
    async fn prepare<B: Browser>(&self, _page: &mut B) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Gate for logged-in runs
///
/// Fails when the page shows a login form or a security checkpoint instead
/// of the requested content.
#[derive(Debug, Clone)]
pub struct CheckpointGate {
    login_indicators: Vec<Selector>,
    checkpoint_texts: Vec<String>,
    checkpoint_paths: Vec<String>,
}

impl Default for CheckpointGate {
    fn default() -> Self {
        Self {
            login_indicators: vec![
                Selector::css(r#"input[name="pass"]"#),
                Selector::css(r#"input[name="password"]"#),
                Selector::css("form#login_form"),
            ],
            checkpoint_texts: [
                "Challenge Required",
                "Suspicious Login Attempt",
                "Enter security code",
                "Sorry, your password was incorrect",
            ]
            .iter()
            .map(|text| text.to_string())
            .collect(),
            checkpoint_paths: vec!["/challenge/".to_string(), "/accounts/login".to_string()],
        }
    }
}

impl CheckpointGate {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionGate for CheckpointGate {
    async fn prepare<B: Browser>(&self, page: &mut B) -> Result<(), AuthError> {
        let url = page.current_url().unwrap_or_default();

        if let Some(path) = self.checkpoint_paths.iter().find(|path| url.contains(path.as_str())) {
            return Err(AuthError::Checkpoint {
                url: url.clone(),
                signal: format!("redirected to {}", path),
            });
        }

        for text in &self.checkpoint_texts {
            if present(&*page, &Selector::text(text)).await {
                return Err(AuthError::Checkpoint {
                    url,
                    signal: text.clone(),
                });
            }
        }

        for indicator in &self.login_indicators {
            if present(&*page, indicator).await {
                return Err(AuthError::LoginRequired {
                    url,
                    indicator: indicator.to_string(),
                });
            }
        }

        debug!(url = %url, "Session check passed");
        Ok(())
    }
}

/// Whether `selector` matches; a failed query counts as no match
async fn present<B: Browser>(page: &B, selector: &Selector) -> bool {
    match page.query_one(&Scope::Document, selector).await {
        Ok(found) => found.is_some(),
        Err(e) => {
            debug!(selector = %selector, error = %e, "Session check query failed");
            false
        }
    }
}
