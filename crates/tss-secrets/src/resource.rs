//! Secret resource lifecycle
//!
//! Create, read, update and delete for a declaratively configured secret.
//! Scalar attributes are copied across as they are; the item list goes
//! through [`crate::reconcile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::RemoteClient;
use crate::error::ReconcileError;
use crate::model::{Secret, SshKeyDirective, Template};
use crate::reconcile::{to_secret_fields, to_secret_items, SecretItem};
use crate::template::resolve_template;

fn default_site_id() -> i64 {
    1
}

fn default_unset() -> i64 {
    -1
}

fn default_true() -> bool {
    true
}

/// Desired state of a secret, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    pub name: String,
    pub secret_template_id: i64,
    /// Distributed engine site used for operations such as password changing
    #[serde(default = "default_site_id")]
    pub site_id: i64,
    /// -1 for the root folder
    #[serde(default = "default_unset")]
    pub folder_id: i64,
    #[serde(default = "default_unset")]
    pub secret_policy_id: i64,
    #[serde(default)]
    pub generate_ssh_keys: bool,
    #[serde(default)]
    pub generate_ssh_passphrase: bool,
    #[serde(default)]
    pub auto_change_enabled: bool,
    #[serde(default)]
    pub check_out_change_password_enabled: bool,
    #[serde(default)]
    pub check_out_enabled: bool,
    #[serde(default = "default_unset")]
    pub check_out_interval_minutes: i64,
    #[serde(default)]
    pub delay_indexing: bool,
    #[serde(default = "default_true")]
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
    #[serde(rename = "item")]
    pub items: Vec<SecretItem>,
}

impl SecretConfig {
    /// A configuration with every optional attribute at its default
    pub fn new(name: &str, secret_template_id: i64, items: Vec<SecretItem>) -> Self {
        Self {
            name: name.to_string(),
            secret_template_id,
            site_id: default_site_id(),
            folder_id: default_unset(),
            secret_policy_id: default_unset(),
            generate_ssh_keys: false,
            generate_ssh_passphrase: false,
            auto_change_enabled: false,
            check_out_change_password_enabled: false,
            check_out_enabled: false,
            check_out_interval_minutes: default_unset(),
            delay_indexing: false,
            enable_inherit_permissions: true,
            enable_inherit_secret_policy: false,
            proxy_enabled: false,
            requires_comment: false,
            session_recording_enabled: false,
            web_launcher_requires_incognito_mode: false,
            items,
        }
    }

    pub fn directive(&self) -> SshKeyDirective {
        SshKeyDirective {
            generate_ssh_keys: self.generate_ssh_keys,
            generate_ssh_passphrase: self.generate_ssh_passphrase,
        }
    }

    /// Build the server-bound secret
    pub fn to_model(&self, template: &Template, id: i64) -> Result<Secret, ReconcileError> {
        let directive = self.directive();
        directive.validate()?;

        Ok(Secret {
            id,
            name: self.name.clone(),
            secret_template_id: self.secret_template_id,
            site_id: self.site_id,
            folder_id: self.folder_id,
            secret_policy_id: self.secret_policy_id,
            active: true,
            auto_change_enabled: self.auto_change_enabled,
            check_out_change_password_enabled: self.check_out_change_password_enabled,
            check_out_enabled: self.check_out_enabled,
            check_out_interval_minutes: self.check_out_interval_minutes,
            delay_indexing: self.delay_indexing,
            enable_inherit_permissions: self.enable_inherit_permissions,
            enable_inherit_secret_policy: self.enable_inherit_secret_policy,
            proxy_enabled: self.proxy_enabled,
            requires_comment: self.requires_comment,
            session_recording_enabled: self.session_recording_enabled,
            web_launcher_requires_incognito_mode: self.web_launcher_requires_incognito_mode,
            fields: to_secret_fields(&self.name, &self.items, template)?,
            ssh_key_args: directive.is_active().then_some(directive),
        })
    }
}

/// Stored state of a secret after the last operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretState {
    pub id: i64,
    pub active: bool,
    #[serde(flatten)]
    pub secret: SecretConfig,
    pub updated_at: DateTime<Utc>,
}

impl SecretState {
    /// Build state from a server response
    ///
    /// `prior` is the item order to keep. The SSH directive is never returned
    /// by the server, so it is carried over from `directive`.
    pub fn from_model(
        model: &Secret,
        prior: &[SecretItem],
        directive: SshKeyDirective,
    ) -> Result<Self, ReconcileError> {
        let items = to_secret_items(model, prior)?;

        Ok(Self {
            id: model.id,
            active: model.active,
            secret: SecretConfig {
                name: model.name.clone(),
                secret_template_id: model.secret_template_id,
                site_id: model.site_id,
                folder_id: model.folder_id,
                secret_policy_id: model.secret_policy_id,
                generate_ssh_keys: directive.generate_ssh_keys,
                generate_ssh_passphrase: directive.generate_ssh_passphrase,
                auto_change_enabled: model.auto_change_enabled,
                check_out_change_password_enabled: model.check_out_change_password_enabled,
                check_out_enabled: model.check_out_enabled,
                check_out_interval_minutes: model.check_out_interval_minutes,
                delay_indexing: model.delay_indexing,
                enable_inherit_permissions: model.enable_inherit_permissions,
                enable_inherit_secret_policy: model.enable_inherit_secret_policy,
                proxy_enabled: model.proxy_enabled,
                requires_comment: model.requires_comment,
                session_recording_enabled: model.session_recording_enabled,
                web_launcher_requires_incognito_mode: model.web_launcher_requires_incognito_mode,
                items,
            },
            updated_at: Utc::now(),
        })
    }

    fn checked_id(&self) -> Result<i64, ReconcileError> {
        if self.id <= 0 {
            return Err(ReconcileError::InvalidId(self.id));
        }
        Ok(self.id)
    }
}

/// Create the secret described by `config`
pub fn create<C>(client: &C, config: &SecretConfig) -> Result<SecretState, ReconcileError>
where
    C: RemoteClient + ?Sized,
{
    debug!("Creating secret with name '{}'", config.name);

    let template = resolve_template(client, config.secret_template_id)?;
    let model = config.to_model(&template, 0)?;
    let secret = client.create_secret(model)?;
    let state = SecretState::from_model(&secret, &config.items, config.directive())?;

    info!("Created secret with name '{}' and ID {}", secret.name, secret.id);
    Ok(state)
}

/// Refresh stored state from the server
pub fn read<C>(client: &C, state: &SecretState) -> Result<SecretState, ReconcileError>
where
    C: RemoteClient + ?Sized,
{
    let id = state.checked_id()?;
    debug!("Reading secret with name '{}' and ID {}", state.secret.name, id);

    let secret = client.secret(id)?;
    SecretState::from_model(&secret, &state.secret.items, state.secret.directive())
}

/// Push `config` onto the existing secret
pub fn update<C>(
    client: &C,
    config: &SecretConfig,
    state: &SecretState,
) -> Result<SecretState, ReconcileError>
where
    C: RemoteClient + ?Sized,
{
    let id = state.checked_id()?;
    debug!("Updating secret with name '{}' and ID {}", config.name, id);

    let template = resolve_template(client, config.secret_template_id)?;
    // Keys are generated on create only; the server rejects the directive on update
    let model = config.to_model(&template, id)?.without_ssh_key_args();
    let secret = client.update_secret(model)?;
    let updated = SecretState::from_model(&secret, &config.items, config.directive())?;

    info!("Updated secret with name '{}' and ID {}", secret.name, secret.id);
    Ok(updated)
}

/// Remove the secret
pub fn delete<C>(client: &C, state: &SecretState) -> Result<(), ReconcileError>
where
    C: RemoteClient + ?Sized,
{
    let id = state.checked_id()?;
    debug!("Deleting secret with name '{}' and ID {}", state.secret.name, id);

    client.delete_secret(id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteError;
    use crate::error::ErrorKind;
    use crate::model::{FieldDefinition, SshKeyMapping};
    use crate::store::MemoryServer;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    fn server() -> MemoryServer {
        let server = MemoryServer::new();
        server.add_template(Template {
            id: 6001,
            name: "Unix Account (SSH)".to_string(),
            fields: vec![
                FieldDefinition::new(1, "machine"),
                FieldDefinition::new(2, "username"),
                FieldDefinition::new(3, "password").password(),
                FieldDefinition::new(4, "private-key").file(),
                FieldDefinition::new(5, "public-key").file(),
                FieldDefinition::new(6, "private-key-passphrase").password(),
                FieldDefinition::new(7, "notes").notes(),
            ],
            ssh_key_mapping: Some(SshKeyMapping {
                public_key: "public-key".to_string(),
                private_key: "private-key".to_string(),
                passphrase: Some("private-key-passphrase".to_string()),
            }),
        });
        server
    }

    fn config() -> SecretConfig {
        SecretConfig::new(
            "db01",
            6001,
            vec![
                SecretItem::new("username", "root"),
                SecretItem::new("machine", "db01.internal"),
                SecretItem::new("password", "hunter2"),
            ],
        )
    }

    fn pairs(items: &[SecretItem]) -> Vec<(&str, Option<&str>)> {
        items
            .iter()
            .map(|i| (i.field.as_str(), i.value.as_deref()))
            .collect()
    }

    #[test]
    fn test_create_then_read_is_stable() {
        let server = server();
        let config = config();

        let created = create(&server, &config).unwrap();
        assert_eq!(created.id, 1);
        assert!(created.active);
        assert_eq!(pairs(&created.secret.items), pairs(&config.items));
        assert_eq!(created.secret.site_id, 1);
        assert!(created.secret.enable_inherit_permissions);

        let refreshed = read(&server, &created).unwrap();
        assert_eq!(refreshed.secret, created.secret);
    }

    #[test]
    fn test_create_with_unknown_template() {
        let server = server();
        let mut config = config();
        config.secret_template_id = 9999;

        let err = create(&server, &config).unwrap_err();
        assert!(matches!(err, ReconcileError::TemplateNotFound(9999)));
    }

    #[test]
    fn test_create_with_unknown_slug_sends_nothing() {
        let server = server();
        let mut config = config();
        config.items.push(SecretItem::new("doesnotexist", "x"));

        let err = create(&server, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(server.secret(1), Err(RemoteError::NotFound { .. })));
    }

    #[test]
    fn test_update_applies_changes_and_clears_removed_items() {
        let server = server();
        let created = create(&server, &config()).unwrap();

        let mut desired = config();
        desired.items.retain(|i| i.field != "password");
        desired.items[0].value = Some("admin".to_string());
        desired.requires_comment = true;

        let updated = update(&server, &desired, &created).unwrap();
        assert_eq!(
            pairs(&updated.secret.items),
            vec![("username", Some("admin")), ("machine", Some("db01.internal"))]
        );
        assert!(updated.secret.requires_comment);
        assert_eq!(server.secret(created.id).unwrap().field("password"), Some(""));
    }

    #[test]
    fn test_read_surfaces_server_side_edits() {
        let server = server();
        let created = create(&server, &config()).unwrap();
        server.set_field(created.id, "notes", "rotated by ops").unwrap();

        let refreshed = read(&server, &created).unwrap();
        let last = refreshed.secret.items.last().unwrap();
        assert_eq!(last.field, "notes");
        assert_eq!(last.value.as_deref(), Some("rotated by ops"));
        assert!(last.is_notes);
    }

    #[test]
    fn test_encoded_file_round_trip() {
        let server = server();
        let encoded = STANDARD.encode("hello");
        let config = SecretConfig::new(
            "files",
            6001,
            vec![SecretItem::new("private-key", &encoded).encoded()],
        );

        let created = create(&server, &config).unwrap();
        assert_eq!(server.secret(created.id).unwrap().field("private-key"), Some("hello"));
        assert_eq!(created.secret.items[0].value.as_deref(), Some(encoded.as_str()));
        assert!(created.secret.items[0].file_attachment_id > 0);

        let refreshed = read(&server, &created).unwrap();
        assert_eq!(refreshed.secret.items, created.secret.items);
    }

    #[test]
    fn test_ssh_generation_on_create_then_update() {
        let server = server();
        let mut config = SecretConfig::new("bastion", 6001, vec![SecretItem::new("username", "ops")]);
        config.generate_ssh_keys = true;
        config.generate_ssh_passphrase = true;

        let created = create(&server, &config).unwrap();
        let slugs: Vec<&str> = created.secret.items.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(slugs, vec!["username", "private-key", "public-key", "private-key-passphrase"]);
        assert!(created.secret.generate_ssh_keys);

        // The directive is stripped, so the update is accepted and keys survive only if declared
        let updated = update(&server, &config, &created).unwrap();
        assert!(updated.secret.generate_ssh_passphrase);
        assert_eq!(pairs(&updated.secret.items), vec![("username", Some("ops"))]);
    }

    #[test]
    fn test_passphrase_without_keys() {
        let server = server();
        let mut config = config();
        config.generate_ssh_passphrase = true;

        assert!(matches!(
            create(&server, &config),
            Err(ReconcileError::PassphraseWithoutKeys)
        ));
    }

    #[test]
    fn test_read_missing_prior_field_is_state_error() {
        let server = server();
        let mut created = create(&server, &config()).unwrap();
        created.secret.items.push(SecretItem::new("retired", "x"));

        let err = read(&server, &created).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConsistency);
    }

    #[test]
    fn test_delete() {
        let server = server();
        let created = create(&server, &config()).unwrap();

        delete(&server, &created).unwrap();
        let err = read(&server, &created).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_invalid_id() {
        let server = server();
        let mut created = create(&server, &config()).unwrap();
        created.id = 0;

        assert!(matches!(read(&server, &created), Err(ReconcileError::InvalidId(0))));
        assert!(matches!(delete(&server, &created), Err(ReconcileError::InvalidId(0))));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: SecretConfig = serde_json::from_str(
            r#"{"name": "db", "secret_template_id": 6001, "item": [{"field": "username", "value": "root"}]}"#,
        )
        .unwrap();
        assert_eq!(config, SecretConfig::new("db", 6001, vec![SecretItem::new("username", "root")]));
    }
}
