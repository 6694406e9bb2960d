//! Change planning
//!
//! Compares a configuration with stored state attribute by attribute, the
//! way a declarative engine would, and decides what an apply has to do.

use serde::Serialize;
use tracing::warn;

use crate::reconcile::SecretItem;
use crate::resource::{SecretConfig, SecretState};
use crate::suppress::{suppress_change, ITEM_COUNT_PATH};

/// What an apply will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Create,
    /// Delete and create again; some attributes cannot change in place
    Replace,
    Update,
    NoOp,
}

impl PlanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::Create => "create",
            PlanAction::Replace => "replace",
            PlanAction::Update => "update",
            PlanAction::NoOp => "no-op",
        }
    }
}

/// One differing attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    pub path: String,
    /// Stored value
    pub old: String,
    /// Configured value
    pub new: String,
    pub sensitive: bool,
    /// Changing this attribute forces replacement
    pub forces_new: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub action: PlanAction,
    pub changes: Vec<AttributeChange>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.action != PlanAction::NoOp
    }
}

/// Attributes that cannot be changed on an existing secret
const FORCE_NEW: &[&str] = &["secret_template_id", "generate_ssh_keys", "generate_ssh_passphrase"];

/// Work out what it takes to bring `state` in line with `config`
pub fn plan(config: &SecretConfig, state: Option<&SecretState>) -> Plan {
    let Some(state) = state else {
        return Plan {
            action: PlanAction::Create,
            changes: Vec::new(),
        };
    };

    let directive = config.directive();
    let mut changes = Vec::new();

    for (path, old, new, sensitive) in compared_attributes(config, &state.secret) {
        if suppress_change(&path, &old, &new, directive) {
            if old != new {
                warn!(
                    "Ignoring difference at '{}' on the secret named '{}' since SSH generation is enabled",
                    path, config.name
                );
            }
            continue;
        }

        let forces_new = FORCE_NEW.contains(&path.as_str());
        changes.push(AttributeChange {
            path,
            old,
            new,
            sensitive,
            forces_new,
        });
    }

    let action = if changes.iter().any(|c| c.forces_new) {
        PlanAction::Replace
    } else if changes.is_empty() {
        PlanAction::NoOp
    } else {
        PlanAction::Update
    };

    Plan { action, changes }
}

type Compared = (String, String, String, bool);

/// Every attribute the configuration has an opinion on, as (path, old, new, sensitive)
fn compared_attributes(config: &SecretConfig, stored: &SecretConfig) -> Vec<Compared> {
    let mut out = Vec::new();
    let mut scalar = |path: &str, old: String, new: String| {
        out.push((path.to_string(), old, new, false));
    };

    scalar("name", stored.name.clone(), config.name.clone());
    scalar(
        "secret_template_id",
        stored.secret_template_id.to_string(),
        config.secret_template_id.to_string(),
    );
    scalar("site_id", stored.site_id.to_string(), config.site_id.to_string());
    scalar("folder_id", stored.folder_id.to_string(), config.folder_id.to_string());
    scalar(
        "secret_policy_id",
        stored.secret_policy_id.to_string(),
        config.secret_policy_id.to_string(),
    );
    scalar(
        "generate_ssh_keys",
        stored.generate_ssh_keys.to_string(),
        config.generate_ssh_keys.to_string(),
    );
    scalar(
        "generate_ssh_passphrase",
        stored.generate_ssh_passphrase.to_string(),
        config.generate_ssh_passphrase.to_string(),
    );
    scalar(
        "auto_change_enabled",
        stored.auto_change_enabled.to_string(),
        config.auto_change_enabled.to_string(),
    );
    scalar(
        "check_out_change_password_enabled",
        stored.check_out_change_password_enabled.to_string(),
        config.check_out_change_password_enabled.to_string(),
    );
    scalar(
        "check_out_enabled",
        stored.check_out_enabled.to_string(),
        config.check_out_enabled.to_string(),
    );
    scalar(
        "check_out_interval_minutes",
        stored.check_out_interval_minutes.to_string(),
        config.check_out_interval_minutes.to_string(),
    );
    scalar(
        "delay_indexing",
        stored.delay_indexing.to_string(),
        config.delay_indexing.to_string(),
    );
    scalar(
        "enable_inherit_permissions",
        stored.enable_inherit_permissions.to_string(),
        config.enable_inherit_permissions.to_string(),
    );
    scalar(
        "enable_inherit_secret_policy",
        stored.enable_inherit_secret_policy.to_string(),
        config.enable_inherit_secret_policy.to_string(),
    );
    scalar(
        "proxy_enabled",
        stored.proxy_enabled.to_string(),
        config.proxy_enabled.to_string(),
    );
    scalar(
        "requires_comment",
        stored.requires_comment.to_string(),
        config.requires_comment.to_string(),
    );
    scalar(
        "session_recording_enabled",
        stored.session_recording_enabled.to_string(),
        config.session_recording_enabled.to_string(),
    );
    scalar(
        "web_launcher_requires_incognito_mode",
        stored.web_launcher_requires_incognito_mode.to_string(),
        config.web_launcher_requires_incognito_mode.to_string(),
    );

    out.push((
        ITEM_COUNT_PATH.to_string(),
        stored.items.len().to_string(),
        config.items.len().to_string(),
        false,
    ));

    let count = stored.items.len().max(config.items.len());
    for index in 0..count {
        item_attributes(
            index,
            stored.items.get(index),
            config.items.get(index),
            &mut out,
        );
    }

    out
}

/// Item attributes; server-computed ones are compared only when configured
fn item_attributes(
    index: usize,
    stored: Option<&SecretItem>,
    configured: Option<&SecretItem>,
    out: &mut Vec<Compared>,
) {
    let prefix = format!("item.{}", index);
    let stored_field = stored.map(|i| i.field.clone()).unwrap_or_default();
    let configured_field = configured.map(|i| i.field.clone()).unwrap_or_default();
    out.push((format!("{}.field", prefix), stored_field, configured_field, false));

    let Some(configured) = configured else {
        return;
    };

    if let Some(value) = &configured.value {
        let old = stored.and_then(|i| i.value.clone()).unwrap_or_default();
        out.push((format!("{}.value", prefix), old, value.clone(), true));
    }
    if let Some(filename) = &configured.filename {
        let old = stored.and_then(|i| i.filename.clone()).unwrap_or_default();
        out.push((format!("{}.filename", prefix), old, filename.clone(), false));
    }
    let old_encoded = stored.map(|i| i.file_encoded).unwrap_or_default();
    out.push((
        format!("{}.file_encoded", prefix),
        old_encoded.to_string(),
        configured.file_encoded.to_string(),
        false,
    ));
}
