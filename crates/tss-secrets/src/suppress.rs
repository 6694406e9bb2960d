//! Diff suppression for generated SSH material
//!
//! When the server generates SSH keys or a passphrase it fills in items the
//! user never declares. Comparing "not declared" against "stored" would show
//! a change on every plan, so those differences are suppressed.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::SshKeyDirective;

/// Path of the item count attribute
pub const ITEM_COUNT_PATH: &str = "item.#";

fn item_field_path() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^item\.\d+\.field$").expect("valid item field pattern"))
}

/// Whether a difference at `path` should be treated as no change
///
/// `old` is the stored value, `new` the configured one. Identical values are
/// never a change. With SSH generation active, an item whose slug is not
/// configured and an item list that is shorter than stored are both expected.
pub fn suppress_change(path: &str, old: &str, new: &str, directive: SshKeyDirective) -> bool {
    if old == new {
        return true;
    }
    if !directive.is_active() {
        return false;
    }

    if item_field_path().is_match(path) && new.is_empty() {
        return true;
    }

    if path == ITEM_COUNT_PATH {
        if let (Ok(old_count), Ok(new_count)) = (old.parse::<usize>(), new.parse::<usize>()) {
            return new_count < old_count;
        }
    }

    false
}
