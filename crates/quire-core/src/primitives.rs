//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Quire resolution layer.
//!
//! These are compiled into the binary and immutable at runtime. Anything a
//! wiki operator may want to localise lives in `ResolverConfig` instead.

/// Separator between a namespace and a title in a full page name.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Maximum length of a canonical title, in bytes.
///
/// Longer titles are rejected by the normalizer.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Redirect keyword used when the configuration names none.
pub const DEFAULT_REDIRECT_KEYWORD: &str = "REDIRECT";

/// Namespace that bare template names belong to.
pub const TEMPLATE_NAMESPACE: &str = "Template";

/// Magic bytes for the stored page record header.
///
/// - Record = Magic Bytes ("QUIR") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"QUIR";

/// Current record format version.
///
/// Increment this when making breaking changes to `PageRecord`.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum size of a single stored page record payload (16 MB).
///
/// Checked before decoding so a corrupted length cannot trigger a huge
/// allocation.
pub const MAX_RECORD_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Build the notice shown for a redirect whose target could not be resolved.
///
/// A redirect must never silently vanish, so the reader gets a one-item list
/// linking to the target instead of empty content.
#[must_use]
pub fn redirect_notice(target_full_name: &str) -> String {
    format!("<ol><li>REDIRECT [[{}]]</li></ol>", target_full_name)
}
