//! tss-secrets - Declarative secrets for a Thycotic-style secret server
//!
//! A secret is a named bundle of typed fields (passwords, files, notes)
//! bound to a server-side template. This crate keeps a declared secret and
//! the server's copy in step: it turns the user's ordered item list into the
//! field collection the server wants, turns the server's answer back into an
//! item list that diffs cleanly against the configuration, and knows which
//! differences to ignore when the server generated SSH keys on create.
//!
//! The server itself sits behind [`RemoteClient`]. [`store`] has a local
//! stand-in used by the `tss-secret` tool and by tests.

pub mod client;
pub mod datasource;
pub mod error;
pub mod model;
pub mod password;
pub mod plan;
pub mod reconcile;
pub mod resource;
pub mod store;
pub mod suppress;
pub mod template;

pub use client::{RemoteClient, RemoteError};
pub use error::{Direction, ErrorKind, ReconcileError};
pub use model::{FieldDefinition, Secret, SecretField, SshKeyDirective, Template};
pub use plan::{plan, Plan, PlanAction};
pub use reconcile::{to_secret_fields, to_secret_items, SecretItem};
pub use resource::{SecretConfig, SecretState};
pub use store::{FileServer, MemoryServer};
pub use suppress::suppress_change;
pub use template::resolve_template;
