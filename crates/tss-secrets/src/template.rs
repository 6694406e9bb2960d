//! Template resolution

use tracing::debug;

use crate::client::{RemoteClient, RemoteError};
use crate::error::ReconcileError;
use crate::model::Template;

/// Fetch the template a secret is bound to
///
/// A missing template is a configuration error. Any other server failure is
/// passed through as-is; template ids are fixed in configuration, so there is
/// nothing to retry.
pub fn resolve_template<C>(client: &C, template_id: i64) -> Result<Template, ReconcileError>
where
    C: RemoteClient + ?Sized,
{
    debug!("Resolving secret template {}", template_id);

    let template = match client.secret_template(template_id) {
        Ok(template) => template,
        Err(RemoteError::NotFound { .. }) => {
            return Err(ReconcileError::TemplateNotFound(template_id))
        }
        Err(e) => return Err(e.into()),
    };

    template.validate()?;
    Ok(template)
}
