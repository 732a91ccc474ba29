#![forbid(unsafe_code)]

//! Operation Classifier.
//!
//! Membership runs pick one [`MembershipMode`] up front and apply it to every row.
//! Metadata runs classify each row by its shape into a [`MetadataOp`].

use crate::error::ConfigError;
use crate::source::{MetadataRow, optional_id};
use br_core::{FieldId, ItemId, MetadataValueId};
use unicode_normalization::UnicodeNormalization;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipMode {
    Map,
    Move,
    Unmap,
}

impl MembershipMode {
    /// Exactly one flag must be set.
    pub fn from_flags(map: bool, mv: bool, unmap: bool) -> Result<Self, ConfigError> {
        match (map, mv, unmap) {
            (true, false, false) => Ok(Self::Map),
            (false, true, false) => Ok(Self::Move),
            (false, false, true) => Ok(Self::Unmap),
            _ => Err(ConfigError::ModeSelection {
                given: [map, mv, unmap].into_iter().filter(|flag| *flag).count(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Move => "move",
            Self::Unmap => "unmap",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataOp {
    Create {
        item: ItemId,
        field: FieldId,
        text: String,
    },
    /// `field` is `None` when the row leaves `metadata_field_id` empty; the stored
    /// field is kept.
    Update {
        id: MetadataValueId,
        field: Option<FieldId>,
        text: String,
    },
    Delete {
        id: MetadataValueId,
    },
}

impl MetadataOp {
    /// Classifies a row by shape. The error is a reason for a malformed row.
    pub fn classify(row: MetadataRow) -> Result<Self, String> {
        let text = normalize_text(&row.text);
        let Some(id) = row.value_id else {
            let item = optional_id(&row.item_id, "item_id", ItemId::parse)?
                .ok_or_else(|| "item_id is required to create a metadata value".to_string())?;
            let field = row.field.ok_or_else(|| {
                "metadata_field_id is required to create a metadata value".to_string()
            })?;
            return Ok(Self::Create { item, field, text });
        };
        if text.is_empty() {
            return Ok(Self::Delete { id });
        }
        Ok(Self::Update {
            id,
            field: row.field,
            text,
        })
    }

    /// Value the row addresses; a create has none until its id is reserved.
    pub fn value_id(&self) -> Option<MetadataValueId> {
        match self {
            Self::Create { .. } => None,
            Self::Update { id, .. } | Self::Delete { id } => Some(*id),
        }
    }

    /// Normalized new text; empty for a delete.
    pub fn text(&self) -> &str {
        match self {
            Self::Create { text, .. } | Self::Update { text, .. } => text,
            Self::Delete { .. } => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Canonical composed (NFC) form.
pub fn normalize_text(text: &str) -> String {
    text.nfc().collect()
}
