#![forbid(unsafe_code)]

use br_core::{FieldId, MetadataValue};

/// An update is a no-op only when both the text and the field already match.
/// A row without a field id compares against the stored field, so text decides.
pub fn is_noop(stored: &MetadataValue, text: &str, field: Option<FieldId>) -> bool {
    stored.text == text && field.is_none_or(|field| field == stored.field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use br_core::{ItemId, MetadataValueId};

    fn stored() -> MetadataValue {
        MetadataValue {
            id: MetadataValueId::new(10),
            item: ItemId::new(2),
            field: FieldId::new(64),
            text: "Caf\u{e9}".to_string(),
            language: Some("en".to_string()),
        }
    }

    #[test]
    fn same_text_and_field_is_skipped() {
        assert!(is_noop(&stored(), "Caf\u{e9}", Some(FieldId::new(64))));
        assert!(is_noop(&stored(), "Caf\u{e9}", None));
    }

    #[test]
    fn same_text_with_other_field_is_not_skipped() {
        assert!(!is_noop(&stored(), "Caf\u{e9}", Some(FieldId::new(65))));
    }

    #[test]
    fn other_text_is_not_skipped() {
        assert!(!is_noop(&stored(), "Cafe", Some(FieldId::new(64))));
        assert!(!is_noop(&stored(), "Cafe", None));
    }
}
