use serde::{Deserialize, Serialize};

/// The administrator acting on a request, recorded in audit events and used
/// to key pending flash notices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

impl UserContext {
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            user_email: None,
            user_name: None,
        }
    }

    pub fn with_details(user_id: String, email: Option<String>, name: Option<String>) -> Self {
        Self {
            user_id,
            user_email: email,
            user_name: name,
        }
    }

    /// Actor for seeding and other internal operations
    pub fn system() -> Self {
        Self {
            user_id: "system".to_string(),
            user_email: Some("system@toolbox.internal".to_string()),
            user_name: Some("System".to_string()),
        }
    }

    /// Fallback actor for development when no identity headers are sent
    pub fn default_user() -> Self {
        Self {
            user_id: "dev-admin".to_string(),
            user_email: Some("admin@localhost".to_string()),
            user_name: Some("Development Admin".to_string()),
        }
    }

    /// Name shown in audit log lines
    pub fn label(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.user_id)
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::default_user()
    }
}
