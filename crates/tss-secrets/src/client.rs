//! Interface to the secret server
//!
//! Reconciliation never talks to the network itself. Everything it needs
//! from the server goes through [`RemoteClient`].

use thiserror::Error;

use crate::model::{Secret, Template};

/// Errors reported by a secret server
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Server rejected the request: {0}")]
    Rejected(String),

    #[error("Server storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server data error: {0}")]
    Data(#[from] serde_json::Error),
}

impl RemoteError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        RemoteError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Operations a secret server offers
pub trait RemoteClient {
    /// Create a secret; the response carries the assigned id and field metadata
    fn create_secret(&self, secret: Secret) -> Result<Secret, RemoteError>;

    fn secret(&self, id: i64) -> Result<Secret, RemoteError>;

    /// Look up a secret by its folder path and name, e.g. `/infra/db/prod`
    fn secret_by_path(&self, path: &str) -> Result<Secret, RemoteError>;

    fn update_secret(&self, secret: Secret) -> Result<Secret, RemoteError>;

    fn delete_secret(&self, id: i64) -> Result<(), RemoteError>;

    fn secret_template(&self, id: i64) -> Result<Template, RemoteError>;

    /// Generate a password satisfying the rules of a password field
    fn generate_password(&self, slug: &str, template: &Template) -> Result<String, RemoteError>;
}
