//! Finding provider tags anywhere in a document

use super::address::{Address, Segment};
use super::node::Document;

/// A container holding a provider key
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Address of the container (not of the provider key inside it)
    pub address: Address,
    /// The provider key's value
    pub config: Document,
    /// Other keys sharing the container with the provider key
    pub siblings: Vec<String>,
}

impl Match {
    /// Whether the provider tag is the sole content of its container
    pub fn is_exclusive(&self) -> bool {
        self.siblings.is_empty()
    }
}

/// Find every mapping that holds `key`, at any depth
///
/// Sequences are searched element by element. A matching container is not
/// descended into: whatever sits under the provider key is that provider's
/// configuration, not document content. Matches are returned in document
/// order, and their addresses are pairwise distinct and never nested.
pub fn locate(document: &Document, key: &str) -> Vec<Match> {
    let mut matches = Vec::new();
    let mut address = Address::root();
    walk(document, key, &mut address, &mut matches);
    matches
}

fn walk(node: &Document, key: &str, address: &mut Address, matches: &mut Vec<Match>) {
    match node {
        Document::Map(map) => {
            if let Some(config) = map.get(key) {
                matches.push(Match {
                    address: address.clone(),
                    config: config.clone(),
                    siblings: map.keys().filter(|k| k.as_str() != key).cloned().collect(),
                });
                return;
            }
            for (child_key, child) in map {
                address.push(Segment::Key(child_key.clone()));
                walk(child, key, address, matches);
                address.pop();
            }
        }
        Document::Seq(items) => {
            for (index, child) in items.iter().enumerate() {
                address.push(Segment::Index(index));
                walk(child, key, address, matches);
                address.pop();
            }
        }
        _ => {}
    }
}
