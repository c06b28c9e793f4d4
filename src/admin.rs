//! Admin login gate.
//!
//! An in-process credential check issuing short-lived session tokens,
//! consumed by the admin route guard. Explicitly not a security boundary;
//! swap in real authentication before production use.

use crate::config::AdminConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

pub const SESSION_TTL_MINUTES: i64 = 30;

pub struct AdminSessions {
    credentials: AdminConfig,
    tokens: HashMap<String, DateTime<Utc>>,
}

impl AdminSessions {
    pub fn new(credentials: AdminConfig) -> Self {
        Self {
            credentials,
            tokens: HashMap::new(),
        }
    }

    /// Check the credential pair; a match issues a fresh session token.
    pub fn login(&mut self, username: &str, password: &str) -> Option<String> {
        if username != self.credentials.username || password != self.credentials.password {
            tracing::warn!(username, "rejected admin login");
            return None;
        }
        let token = Uuid::now_v7().to_string();
        self.tokens.insert(
            token.clone(),
            Utc::now() + Duration::minutes(SESSION_TTL_MINUTES),
        );
        Some(token)
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.tokens
            .get(token)
            .is_some_and(|expires| *expires > Utc::now())
    }

    pub fn logout(&mut self, token: &str) {
        self.tokens.remove(token);
    }
}
