//! Echo scrolls: redemption items whose value is stamped into their own
//! metadata instead of being looked up.

use crate::item::{ItemMetadata, ItemStack};

/// Item id of an Echo scroll.
pub const SCROLL_ITEM_ID: &str = "EchoScroll";

/// Metadata key holding the scroll's value.
pub const ECHO_VALUE_KEY: &str = "EchoValue";

/// Returns true if `item_id` is the scroll item.
#[inline]
#[must_use]
pub fn is_scroll(item_id: &str) -> bool {
    item_id == SCROLL_ITEM_ID
}

/// Creates a single scroll worth `value` Echoes.
#[must_use]
pub fn create(value: u64) -> ItemStack {
    let mut metadata = ItemMetadata::new();
    metadata.put_u64(ECHO_VALUE_KEY, value);
    ItemStack::new(SCROLL_ITEM_ID, 1).with_metadata(metadata)
}

/// Per-unit value of a scroll stack.
///
/// A scroll whose metadata is missing or holds zero is worth 1.
#[must_use]
pub fn value_of(stack: &ItemStack) -> u64 {
    match stack
        .metadata
        .as_ref()
        .and_then(|meta| meta.get_u64(ECHO_VALUE_KEY))
    {
        Some(value) if value > 0 => value,
        _ => {
            tracing::warn!(
                "Scroll without a readable {} value, treating it as 1",
                ECHO_VALUE_KEY
            );
            1
        }
    }
}
