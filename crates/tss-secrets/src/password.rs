//! Generated passwords
//!
//! A password generated once by the server against a template's password
//! rules. Once generated it is kept as-is: reading or updating the record
//! returns it unchanged and deleting it touches nothing on the server.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RemoteClient;
use crate::error::ReconcileError;
use crate::template::resolve_template;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPassword {
    pub id: String,
    pub template_id: i64,
    pub field: String,
    pub value: String,
}

impl GeneratedPassword {
    /// Ask the server for a password for `field` on `template_id`
    pub fn generate<C>(client: &C, template_id: i64, field: &str) -> Result<Self, ReconcileError>
    where
        C: RemoteClient + ?Sized,
    {
        debug!(
            "Generating password for the '{}' field on template with id {}",
            field, template_id
        );

        let template = resolve_template(client, template_id)?;
        let value = client.generate_password(field, &template)?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            template_id,
            field: field.to_string(),
            value,
        })
    }

    /// Whether this record was generated for the given template field
    pub fn matches(&self, template_id: i64, field: &str) -> bool {
        self.template_id == template_id && self.field == field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{FieldDefinition, Template};
    use crate::store::MemoryServer;

    fn server() -> MemoryServer {
        let server = MemoryServer::new();
        let mut password = FieldDefinition::new(2, "password").password();
        password.password_length = Some(20);
        server.add_template(Template {
            id: 6003,
            name: "Password".to_string(),
            fields: vec![FieldDefinition::new(1, "username"), password],
            ssh_key_mapping: None,
        });
        server
    }

    #[test]
    fn test_generate() {
        let server = server();
        let generated = GeneratedPassword::generate(&server, 6003, "password").unwrap();
        assert_eq!(generated.value.len(), 20);
        assert!(generated.matches(6003, "password"));
        assert!(!generated.matches(6003, "username"));

        let other = GeneratedPassword::generate(&server, 6003, "password").unwrap();
        assert_ne!(generated.id, other.id);
    }

    #[test]
    fn test_generate_rejects_non_password_field() {
        let server = server();
        let err = GeneratedPassword::generate(&server, 6003, "username").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_generate_unknown_template() {
        let server = server();
        assert!(matches!(
            GeneratedPassword::generate(&server, 1, "password"),
            Err(ReconcileError::TemplateNotFound(1))
        ));
    }
}
