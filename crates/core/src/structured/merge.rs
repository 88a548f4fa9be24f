//! Reconcile partial updates from section widgets into a whole structured
//! document.
//!
//! Each widget only knows the keys it renders. Replacing the whole document
//! with a widget's view would erase every sibling, so updates are folded into
//! the last known-good whole instead:
//!
//! - A single-field update rewrites exactly one key (matched case- and
//!   separator-insensitively) and leaves everything else alone.
//! - A view update (several keys, or a card list reporting everything it
//!   shows) overwrites the keys it carries and deletes the keys it dropped,
//!   except protected keys, which survive unless the update carries the
//!   deletion marker.
//!
//! Merging never fails. When a key cannot be attributed to exactly one
//! existing field the previous document is returned unchanged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::document::StructuredDocument;
use super::keys::{canonical, resolve, KeyMatch};
use super::vocabulary::Vocabulary;

/// Reserved key an update carries to mark itself as an explicit deletion.
pub const DELETION_MARKER: &str = "__deletion__";

/// How the sender framed an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateShape {
    /// Shape unknown; a lone protected key is treated as a field edit.
    Inferred,
    /// One widget editing one key.
    Field,
    /// A widget reporting every key it shows; absent keys were removed.
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialUpdate {
    pub fields: BTreeMap<String, String>,
    pub shape: UpdateShape,
    #[serde(default)]
    pub explicit_deletion: bool,
}

impl PartialUpdate {
    pub fn field(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            fields: BTreeMap::from([(key.into(), value.into())]),
            shape: UpdateShape::Field,
            explicit_deletion: false,
        }
    }

    pub fn view<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            shape: UpdateShape::View,
            explicit_deletion: false,
        }
    }

    /// A view update whose removals go through even for protected keys.
    pub fn deletion<I, K, V>(remaining: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            explicit_deletion: true,
            ..Self::view(remaining)
        }
    }

    /// Build an update from a raw widget map, lifting the deletion marker out
    /// of the fields.
    pub fn from_raw(mut fields: BTreeMap<String, String>) -> Self {
        let explicit_deletion = fields.remove(DELETION_MARKER).is_some();
        Self {
            fields,
            shape: UpdateShape::Inferred,
            explicit_deletion,
        }
    }

    fn is_single_field(&self, vocab: &Vocabulary) -> bool {
        if self.explicit_deletion || self.fields.len() != 1 {
            return false;
        }
        match self.shape {
            UpdateShape::Field => true,
            UpdateShape::View => false,
            UpdateShape::Inferred => self.fields.keys().all(|k| vocab.is_protected(k)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeKind {
    SingleField,
    View,
}

/// An update key that addressed more than one existing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAmbiguity {
    pub key: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MergeStatus {
    Applied { kind: MergeKind },
    Unchanged { ambiguity: MergeAmbiguity },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub document: StructuredDocument,
    pub status: MergeStatus,
}

impl MergeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, MergeStatus::Applied { .. })
    }

    fn unchanged(previous: &StructuredDocument, ambiguity: MergeAmbiguity) -> Self {
        tracing::warn!(
            key = %ambiguity.key,
            candidates = ?ambiguity.candidates,
            "ambiguous structured key; keeping previous document"
        );
        Self {
            document: previous.clone(),
            status: MergeStatus::Unchanged { ambiguity },
        }
    }
}

/// Fold `update` into `previous`.
pub fn merge(
    previous: &StructuredDocument,
    update: &PartialUpdate,
    vocab: &Vocabulary,
) -> MergeOutcome {
    if update.is_single_field(vocab) {
        merge_single_field(previous, update)
    } else {
        merge_view(previous, update, vocab)
    }
}

fn merge_single_field(previous: &StructuredDocument, update: &PartialUpdate) -> MergeOutcome {
    let mut merged = previous.clone();
    for (key, value) in &update.fields {
        match resolve(key, previous.keys()) {
            KeyMatch::Found(existing) => merged.set(existing, value.clone()),
            // First write of an optional field lands under the sender's spelling.
            KeyMatch::Missing => merged.set(key.clone(), value.clone()),
            KeyMatch::Ambiguous(candidates) => {
                return MergeOutcome::unchanged(previous, ambiguity(key, candidates));
            }
        }
    }
    MergeOutcome {
        document: merged,
        status: MergeStatus::Applied {
            kind: MergeKind::SingleField,
        },
    }
}

fn merge_view(
    previous: &StructuredDocument,
    update: &PartialUpdate,
    vocab: &Vocabulary,
) -> MergeOutcome {
    // Attribute every update key to at most one existing key, and every
    // existing key to at most one update key.
    let mut writes: Vec<(String, &String)> = Vec::with_capacity(update.fields.len());
    let mut touched: BTreeSet<&str> = BTreeSet::new();
    // New keys by canonical form; two spellings of one new key are ambiguous.
    let mut added: BTreeMap<String, &str> = BTreeMap::new();
    for (key, value) in &update.fields {
        match resolve(key, previous.keys()) {
            KeyMatch::Found(existing) => {
                if !touched.insert(existing) {
                    return MergeOutcome::unchanged(
                        previous,
                        MergeAmbiguity {
                            key: existing.to_string(),
                            candidates: update
                                .fields
                                .keys()
                                .filter(|k| matches!(resolve(k, [existing]), KeyMatch::Found(_)))
                                .cloned()
                                .collect(),
                        },
                    );
                }
                writes.push((existing.to_string(), value));
            }
            KeyMatch::Missing => {
                if let Some(first) = added.insert(canonical(key), key.as_str()) {
                    return MergeOutcome::unchanged(
                        previous,
                        ambiguity(key, vec![first, key.as_str()]),
                    );
                }
                writes.push((key.clone(), value));
            }
            KeyMatch::Ambiguous(candidates) => {
                return MergeOutcome::unchanged(previous, ambiguity(key, candidates));
            }
        }
    }

    let mut merged = previous.clone();
    let removed: Vec<String> = previous
        .keys()
        .filter(|k| !touched.contains(k))
        .map(str::to_string)
        .collect();
    for key in removed {
        if update.explicit_deletion || !vocab.is_protected(&key) {
            merged.remove(&key);
        }
    }
    for (key, value) in writes {
        merged.set(key, value.clone());
    }

    MergeOutcome {
        document: merged,
        status: MergeStatus::Applied {
            kind: MergeKind::View,
        },
    }
}

fn ambiguity(key: &str, candidates: Vec<&str>) -> MergeAmbiguity {
    MergeAmbiguity {
        key: key.to_string(),
        candidates: candidates.into_iter().map(str::to_string).collect(),
    }
}
