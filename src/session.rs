//! Authenticated session passed explicitly to the API client.

use crate::config::ClientConfig;

/// Bearer token plus the doctor the session belongs to.
///
/// Lifecycle is explicit: `load` at startup, `refresh` when a new token is
/// issued, `clear` on logout or when the backend answers 401.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    token: Option<String>,
    doctor_id: Option<i64>,
}

impl AuthSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn load(config: &ClientConfig) -> Self {
        AuthSession {
            token: config.token.clone(),
            doctor_id: config.doctor_id,
        }
    }

    pub fn refresh(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.token = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.doctor_id = None;
    }

    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn doctor_id(&self) -> Option<i64> {
        self.doctor_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
