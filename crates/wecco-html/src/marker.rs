#![forbid(unsafe_code)]

//! Render identity markers.
//!
//! A marker is a short token derived from a template's static fragments
//! only. Elements that own dynamic bindings carry it in the
//! [`MARKER_ATTRIBUTE`] attribute so a later render of the same template
//! can recognize DOM it produced.

/// Attribute stamped on binding-owning elements.
pub const MARKER_ATTRIBUTE: &str = "data-wecco-html-id";

/// Marker length in characters.
pub const MARKER_LEN: usize = 6;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// FNV-1a over the length-prefixed fragments.
///
/// The length prefix keeps `["ab", "c"]` and `["a", "bc"]` apart.
#[must_use]
pub fn shape_hash<S: AsRef<str>>(fragments: &[S]) -> u64 {
    let mut hash = FNV_OFFSET;
    let mut feed = |bytes: &[u8]| {
        for byte in bytes {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    };
    for fragment in fragments {
        let fragment = fragment.as_ref();
        feed(&(fragment.len() as u64).to_le_bytes());
        feed(fragment.as_bytes());
    }
    hash
}

/// The six character base-36 marker for a shape hash.
#[must_use]
pub fn marker_for_hash(hash: u64) -> String {
    let mut value = hash % 36_u64.pow(MARKER_LEN as u32);
    let mut out = [b'0'; MARKER_LEN];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    out.iter().map(|b| char::from(*b)).collect()
}

/// The marker for a fragment sequence.
#[must_use]
pub fn marker_for<S: AsRef<str>>(fragments: &[S]) -> String {
    marker_for_hash(shape_hash(fragments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_six_base36_chars() {
        let marker = marker_for(&["<p>", "</p>"]);
        assert_eq!(marker.len(), MARKER_LEN);
        assert!(
            marker
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn length_prefix_separates_splits() {
        assert_ne!(shape_hash(&["ab", "c"]), shape_hash(&["a", "bc"]));
    }

    #[test]
    fn small_hashes_are_zero_padded() {
        assert_eq!(marker_for_hash(0), "000000");
        assert_eq!(marker_for_hash(35), "00000z");
        assert_eq!(marker_for_hash(36_u64.pow(6)), "000000");
    }
}
