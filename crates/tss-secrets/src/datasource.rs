//! Read a single field from an existing secret

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RemoteClient;
use crate::error::ReconcileError;

/// How to find the secret; `id` wins when both are set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretLookup {
    #[serde(default)]
    pub id: Option<i64>,
    /// Folder path and name, e.g. `/infra/db/prod`
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub id: i64,
    pub field: String,
    pub value: String,
}

/// Fetch the value of `field` on the secret found by `lookup`
pub fn read_field<C>(
    client: &C,
    lookup: &SecretLookup,
    field: &str,
) -> Result<FieldValue, ReconcileError>
where
    C: RemoteClient + ?Sized,
{
    let secret = match (lookup.id.filter(|id| *id != 0), lookup.path.as_deref()) {
        (Some(id), _) => {
            debug!("Getting secret with id {}", id);
            client.secret(id)?
        }
        (None, Some(path)) if !path.is_empty() => {
            debug!("Getting secret at path '{}'", path);
            client.secret_by_path(path)?
        }
        _ => return Err(ReconcileError::MissingLookup),
    };

    debug!("Using '{}' field of secret with id {}", field, secret.id);
    let value = secret
        .field(field)
        .ok_or_else(|| ReconcileError::FieldNotFound(field.to_string()))?;

    Ok(FieldValue {
        id: secret.id,
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDefinition, Secret, SecretField, Template};
    use crate::store::{Folder, MemoryServer};

    fn server_with_secret() -> (MemoryServer, i64) {
        let server = MemoryServer::new();
        server.add_template(Template {
            id: 6003,
            name: "Password".to_string(),
            fields: vec![FieldDefinition::new(1, "username"), FieldDefinition::new(2, "password")],
            ssh_key_mapping: None,
        });
        server.add_folder(Folder {
            id: 3,
            name: "apps".to_string(),
            parent_id: None,
        });
        let created = server
            .create_secret(Secret {
                name: "billing".to_string(),
                secret_template_id: 6003,
                folder_id: 3,
                fields: vec![SecretField {
                    field_id: 1,
                    slug: "username".to_string(),
                    item_value: "svc-billing".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            })
            .unwrap();
        (server, created.id)
    }

    #[test]
    fn test_by_id() {
        let (server, id) = server_with_secret();
        let lookup = SecretLookup {
            id: Some(id),
            path: None,
        };
        let value = read_field(&server, &lookup, "username").unwrap();
        assert_eq!(value.value, "svc-billing");
        assert_eq!(value.id, id);
    }

    #[test]
    fn test_by_path() {
        let (server, id) = server_with_secret();
        let lookup = SecretLookup {
            id: None,
            path: Some("/apps/billing".to_string()),
        };
        assert_eq!(read_field(&server, &lookup, "username").unwrap().id, id);
    }

    #[test]
    fn test_id_wins_over_path() {
        let (server, id) = server_with_secret();
        let lookup = SecretLookup {
            id: Some(id),
            path: Some("/nowhere/at/all".to_string()),
        };
        assert!(read_field(&server, &lookup, "username").is_ok());
    }

    #[test]
    fn test_missing_lookup_and_field() {
        let (server, id) = server_with_secret();
        assert!(matches!(
            read_field(&server, &SecretLookup::default(), "username"),
            Err(ReconcileError::MissingLookup)
        ));

        let lookup = SecretLookup {
            id: Some(id),
            path: None,
        };
        assert!(matches!(
            read_field(&server, &lookup, "token"),
            Err(ReconcileError::FieldNotFound(ref f)) if f == "token"
        ));
    }
}
