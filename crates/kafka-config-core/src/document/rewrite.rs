//! Replacing matched containers with fetched values

use thiserror::Error;

use super::address::Address;
use super::node::Document;

/// Errors raised while rewriting a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewriteError {
    #[error("No node at {0} to replace")]
    MissingAddress(Address),
}

/// Replace each addressed container with its resolved value, then drop any
/// leftover `key` entries from the whole tree
///
/// Each replacement touches exactly one node, so siblings elsewhere in the
/// document are left as they were. Addresses must be distinct and not nested
/// inside one another, which is what [`locate`](super::locate) produces.
pub fn rewrite(
    mut document: Document,
    key: &str,
    resolved: impl IntoIterator<Item = (Address, Document)>,
) -> Result<Document, RewriteError> {
    for (address, value) in resolved {
        let slot = document
            .get_mut(&address)
            .ok_or_else(|| RewriteError::MissingAddress(address.clone()))?;
        *slot = value;
    }
    prune(&mut document, key);
    Ok(document)
}

/// Remove every mapping entry named `key`, at any depth
///
/// Returns how many entries were removed.
pub fn prune(document: &mut Document, key: &str) -> usize {
    match document {
        Document::Map(map) => {
            let removed = usize::from(map.shift_remove(key).is_some());
            removed + map.values_mut().map(|child| prune(child, key)).sum::<usize>()
        }
        Document::Seq(items) => items.iter_mut().map(|child| prune(child, key)).sum(),
        _ => 0,
    }
}
