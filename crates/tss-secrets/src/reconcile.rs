//! Field reconciliation
//!
//! Converts between the ordered item list a user writes and the field
//! collection the server works with.
//!
//! Outbound, every templated field is emitted: fields the configuration does
//! not mention are sent with an empty value, which is how an optional field
//! gets cleared. Inbound, the previous item order is kept so stored state
//! lines up with the configuration, and fields changed on the server that the
//! configuration never named are appended at the end.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{Direction, ReconcileError};
use crate::model::{FieldDefinition, Secret, SecretField, Template};

/// Filename given to file items that do not name one
pub const DEFAULT_FILENAME: &str = "File.txt";

/// One entry in a secret's item list
///
/// `field`, `value`, `filename` and `file_encoded` come from configuration.
/// The remaining attributes are filled in from the server and are never read
/// on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SecretItem {
    /// Field slug
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Value holds base64 of the file content
    #[serde(default)]
    pub file_encoded: bool,

    #[serde(default)]
    pub field_id: i64,
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub field_description: String,
    #[serde(default)]
    pub file_attachment_id: i64,
    #[serde(default)]
    pub is_file: bool,
    #[serde(default)]
    pub is_notes: bool,
    #[serde(default)]
    pub is_password: bool,
    #[serde(default)]
    pub item_id: i64,
}

impl SecretItem {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: Some(value.to_string()),
            ..Default::default()
        }
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    pub fn encoded(mut self) -> Self {
        self.file_encoded = true;
        self
    }

    /// Overwrite everything but `file_encoded` from a server field
    fn absorb(&mut self, field: &SecretField) {
        self.field = field.slug.clone();
        self.value = Some(field.item_value.clone());
        self.filename = Some(field.filename.clone());
        self.field_id = field.field_id;
        self.field_name = field.field_name.clone();
        self.field_description = field.field_description.clone();
        self.file_attachment_id = field.file_attachment_id;
        self.is_file = field.is_file;
        self.is_notes = field.is_notes;
        self.is_password = field.is_password;
        self.item_id = field.item_id;
    }
}

impl From<&SecretField> for SecretItem {
    fn from(field: &SecretField) -> Self {
        let mut item = SecretItem::default();
        item.absorb(field);
        item
    }
}

/// Convert configured items into the full field collection for `template`
///
/// Items are checked in configuration order so the first bad item is the one
/// reported. Nothing is returned unless every item converts.
pub fn to_secret_fields(
    secret_name: &str,
    items: &[SecretItem],
    template: &Template,
) -> Result<Vec<SecretField>, ReconcileError> {
    let definitions: HashMap<&str, &FieldDefinition> = template
        .fields
        .iter()
        .map(|f| (f.slug.as_str(), f))
        .collect();
    let mut fields = Vec::with_capacity(template.fields.len());
    let mut initialized = HashSet::new();

    for item in items {
        if item.field.is_empty() {
            return Err(ReconcileError::MissingFieldSlug {
                secret: secret_name.to_string(),
            });
        }

        let definition = *definitions.get(item.field.as_str()).ok_or_else(|| {
            ReconcileError::UnknownFieldSlug {
                secret: secret_name.to_string(),
                slug: item.field.clone(),
                direction: Direction::Outbound,
            }
        })?;

        let value = item
            .value
            .as_deref()
            .ok_or_else(|| ReconcileError::MissingFieldValue {
                secret: secret_name.to_string(),
                slug: item.field.clone(),
            })?;

        let item_value = if definition.is_file && item.file_encoded {
            debug!("Decoding file item '{}' from base64", item.field);
            decode_file(&item.field, value)?
        } else {
            value.to_string()
        };

        let filename = match (&item.filename, definition.is_file) {
            (Some(name), _) => name.clone(),
            (None, true) => DEFAULT_FILENAME.to_string(),
            (None, false) => String::new(),
        };

        fields.push(SecretField {
            field_id: definition.field_id,
            slug: definition.slug.clone(),
            item_value,
            filename,
            ..Default::default()
        });
        initialized.insert(definition.slug.as_str());
    }

    for definition in &template.fields {
        if !initialized.contains(definition.slug.as_str()) {
            fields.push(SecretField {
                field_id: definition.field_id,
                slug: definition.slug.clone(),
                item_value: String::new(),
                ..Default::default()
            });
        }
    }

    Ok(fields)
}

/// Convert the fields of a server secret into an ordered item list
///
/// Items in `prior` keep their position. Fields the server has that `prior`
/// does not name are appended in server order, but only when they hold
/// something: a value for ordinary fields, a filename for file fields.
pub fn to_secret_items(
    secret: &Secret,
    prior: &[SecretItem],
) -> Result<Vec<SecretItem>, ReconcileError> {
    let by_slug: HashMap<&str, &SecretField> = secret
        .fields
        .iter()
        .map(|f| (f.slug.as_str(), f))
        .collect();
    let mut mapped = HashSet::new();
    let mut items = Vec::with_capacity(secret.fields.len());

    for prior_item in prior {
        let field = by_slug.get(prior_item.field.as_str()).ok_or_else(|| {
            ReconcileError::UnknownFieldSlug {
                secret: secret.name.clone(),
                slug: prior_item.field.clone(),
                direction: Direction::Inbound,
            }
        })?;
        mapped.insert(field.slug.as_str());

        let mut item = prior_item.clone();
        item.absorb(field);
        if field.is_file && item.file_encoded {
            debug!("Encoding file item '{}' to base64 for state", item.field);
            item.value = Some(STANDARD.encode(field.item_value.as_bytes()));
        }
        items.push(item);
    }

    for field in &secret.fields {
        if mapped.contains(field.slug.as_str()) {
            continue;
        }
        if has_value(field) {
            items.push(SecretItem::from(field));
        }
    }

    Ok(items)
}

fn has_value(field: &SecretField) -> bool {
    if field.is_file {
        !field.filename.is_empty()
    } else {
        !field.item_value.is_empty()
    }
}

fn decode_file(slug: &str, value: &str) -> Result<String, ReconcileError> {
    let bytes = STANDARD
        .decode(value)
        .map_err(|e| ReconcileError::InvalidEncoding {
            slug: slug.to_string(),
            reason: e.to_string(),
        })?;

    String::from_utf8(bytes).map_err(|_| ReconcileError::InvalidEncoding {
        slug: slug.to_string(),
        reason: "decoded content is not valid UTF-8".to_string(),
    })
}
