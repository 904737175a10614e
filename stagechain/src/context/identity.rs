//! Session identity.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifies one run context by application, user, and session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    /// The application the session belongs to.
    pub app_name: String,
    /// The user the session belongs to.
    pub user_id: String,
    /// The session id, unique per (application, user).
    pub session_id: String,
}

impl SessionKey {
    /// Creates a new session key.
    #[must_use]
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    /// Creates a key with a freshly generated session id.
    #[must_use]
    pub fn generated(app_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::new(app_name, user_id, crate::utils::generate_uuid().to_string())
    }

    /// Converts to a dictionary with string values.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("app_name".to_string(), serde_json::json!(self.app_name));
        map.insert("user_id".to_string(), serde_json::json!(self.user_id));
        map.insert("session_id".to_string(), serde_json::json!(self.session_id));
        map
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}
