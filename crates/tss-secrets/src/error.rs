//! Reconciliation errors

use thiserror::Error;

use crate::client::RemoteError;

/// Which way a conversion was running when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Configuration items to server fields
    Outbound,
    /// Server fields to stored items
    Inbound,
}

/// Broad classification of a [`ReconcileError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Encoding,
    Remote,
    StateConsistency,
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Secret template not found: {0}")]
    TemplateNotFound(i64),

    #[error("Secret template {template_id} declares the field '{slug}' more than once")]
    DuplicateTemplateSlug { template_id: i64, slug: String },

    #[error("An item on the secret named '{secret}' is missing a field name")]
    MissingFieldSlug { secret: String },

    #[error("An item on the secret named '{secret}' has an unrecognized field name '{slug}'")]
    UnknownFieldSlug {
        secret: String,
        slug: String,
        direction: Direction,
    },

    #[error(
        "The item '{slug}' on the secret named '{secret}' is missing a value. To remove an \
         optional field from a secret, remove the item from the secret's item list"
    )]
    MissingFieldValue { secret: String, slug: String },

    #[error("The item '{slug}' is flagged as base64 encoded but could not be decoded: {reason}")]
    InvalidEncoding { slug: String, reason: String },

    #[error("generate_ssh_passphrase requires generate_ssh_keys to be enabled")]
    PassphraseWithoutKeys,

    #[error("Secret id must be a positive integer, got {0}")]
    InvalidId(i64),

    #[error("Either an id or a path is required to look up a secret")]
    MissingLookup,

    #[error("The secret does not contain a '{0}' field")]
    FieldNotFound(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::InvalidEncoding { .. } => ErrorKind::Encoding,
            ReconcileError::Remote(_) => ErrorKind::Remote,
            ReconcileError::UnknownFieldSlug {
                direction: Direction::Inbound,
                ..
            } => ErrorKind::StateConsistency,
            _ => ErrorKind::Configuration,
        }
    }
}
