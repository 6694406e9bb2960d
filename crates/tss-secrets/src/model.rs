//! Server-side data model
//!
//! The shapes exchanged with the secret server: templates, secrets and
//! their fields.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ReconcileError;

/// One field declared by a secret template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Server-assigned identity of the field
    pub field_id: i64,
    /// Unique, human-readable key (aka slug)
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_file: bool,
    #[serde(default)]
    pub is_notes: bool,
    #[serde(default)]
    pub is_password: bool,
    /// Length of generated passwords for this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_length: Option<usize>,
}

impl FieldDefinition {
    pub fn new(field_id: i64, slug: &str) -> Self {
        Self {
            field_id,
            slug: slug.to_string(),
            name: slug.to_string(),
            description: String::new(),
            is_file: false,
            is_notes: false,
            is_password: false,
            password_length: None,
        }
    }

    pub fn file(mut self) -> Self {
        self.is_file = true;
        self
    }

    pub fn password(mut self) -> Self {
        self.is_password = true;
        self
    }

    pub fn notes(mut self) -> Self {
        self.is_notes = true;
        self
    }
}

/// Which template fields receive generated SSH material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyMapping {
    pub public_key: String,
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

/// The fixed schema for a class of secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Field definitions in template order
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_mapping: Option<SshKeyMapping>,
}

impl Template {
    /// Look up a field definition by slug
    pub fn field(&self, slug: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.slug == slug)
    }

    /// Check that every slug is declared once
    pub fn validate(&self) -> Result<(), ReconcileError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.slug.as_str()) {
                return Err(ReconcileError::DuplicateTemplateSlug {
                    template_id: self.id,
                    slug: field.slug.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A field value on a secret
///
/// Outbound only `slug`, `field_id`, `item_value` and `filename` are
/// meaningful. The server fills in the rest on responses. An empty
/// `item_value` means the field is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SecretField {
    pub field_id: i64,
    pub slug: String,
    #[serde(default)]
    pub item_value: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub field_description: String,
    #[serde(default)]
    pub file_attachment_id: i64,
    #[serde(default)]
    pub item_id: i64,
    #[serde(default)]
    pub is_file: bool,
    #[serde(default)]
    pub is_notes: bool,
    #[serde(default)]
    pub is_password: bool,
}

/// One-shot request to generate SSH material when a secret is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyDirective {
    #[serde(default)]
    pub generate_ssh_keys: bool,
    #[serde(default)]
    pub generate_ssh_passphrase: bool,
}

impl SshKeyDirective {
    pub fn is_active(&self) -> bool {
        self.generate_ssh_keys || self.generate_ssh_passphrase
    }

    /// A passphrase only makes sense for a generated key
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.generate_ssh_passphrase && !self.generate_ssh_keys {
            return Err(ReconcileError::PassphraseWithoutKeys);
        }
        Ok(())
    }
}

/// A secret as the server sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Secret {
    /// Zero until the server assigns one
    pub id: i64,
    pub name: String,
    pub secret_template_id: i64,
    pub site_id: i64,
    pub folder_id: i64,
    pub secret_policy_id: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub auto_change_enabled: bool,
    #[serde(default)]
    pub check_out_change_password_enabled: bool,
    #[serde(default)]
    pub check_out_enabled: bool,
    #[serde(default)]
    pub check_out_interval_minutes: i64,
    #[serde(default)]
    pub delay_indexing: bool,
    #[serde(default)]
    pub enable_inherit_permissions: bool,
    #[serde(default)]
    pub enable_inherit_secret_policy: bool,
    #[serde(default)]
    pub proxy_enabled: bool,
    #[serde(default)]
    pub requires_comment: bool,
    #[serde(default)]
    pub session_recording_enabled: bool,
    #[serde(default)]
    pub web_launcher_requires_incognito_mode: bool,
    #[serde(default)]
    pub fields: Vec<SecretField>,
    /// Only honoured on create; never returned by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_args: Option<SshKeyDirective>,
}

impl Secret {
    /// Value of the field with the given slug
    pub fn field(&self, slug: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.slug == slug)
            .map(|f| f.item_value.as_str())
    }

    /// The same secret with the generation directive removed
    pub fn without_ssh_key_args(self) -> Self {
        Self {
            ssh_key_args: None,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_field_lookup() {
        let template = Template {
            id: 6001,
            name: "Unix Account (SSH)".to_string(),
            fields: vec![
                FieldDefinition::new(108, "username"),
                FieldDefinition::new(109, "private-key").file(),
            ],
            ssh_key_mapping: None,
        };

        assert_eq!(template.field("private-key").map(|f| f.field_id), Some(109));
        assert!(template.field("private-key").unwrap().is_file);
        assert!(template.field("nope").is_none());
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_duplicate_slugs_rejected() {
        let template = Template {
            id: 2,
            name: String::new(),
            fields: vec![
                FieldDefinition::new(1, "password"),
                FieldDefinition::new(2, "password"),
            ],
            ssh_key_mapping: None,
        };

        let err = template.validate().unwrap_err();
        assert!(matches!(err, ReconcileError::DuplicateTemplateSlug { ref slug, .. } if slug == "password"));
    }

    #[test]
    fn test_directive_validation() {
        assert!(!SshKeyDirective::default().is_active());
        assert!(SshKeyDirective::default().validate().is_ok());

        let passphrase_only = SshKeyDirective {
            generate_ssh_keys: false,
            generate_ssh_passphrase: true,
        };
        assert!(passphrase_only.is_active());
        assert!(matches!(
            passphrase_only.validate(),
            Err(ReconcileError::PassphraseWithoutKeys)
        ));
    }

    #[test]
    fn test_without_ssh_key_args() {
        let secret = Secret {
            name: "host".to_string(),
            ssh_key_args: Some(SshKeyDirective {
                generate_ssh_keys: true,
                generate_ssh_passphrase: false,
            }),
            ..Default::default()
        };

        let stripped = secret.clone().without_ssh_key_args();
        assert!(stripped.ssh_key_args.is_none());
        assert_eq!(stripped.name, "host");
        // The source value keeps its directive
        assert!(secret.ssh_key_args.is_some());
    }
}
