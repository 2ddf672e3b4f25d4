//! Wire/native path conversion.
//!
//! Names are stored and exchanged in wire form: Unicode NFC with `/`
//! separators. On the way out they are converted to the platform's native
//! form: `\` separators on Windows, NFD on macOS, unchanged elsewhere.
//!
//! For any wire-form name `w`,
//! `normalized_filename(&native_filename(w)) == w`.

use unicode_normalization::{is_nfc, UnicodeNormalization};

/// Convert a native path to wire form.
pub fn normalized_filename(native: &str) -> String {
    let slashed = if cfg!(windows) {
        native.replace('\\', "/")
    } else {
        native.to_string()
    };

    if is_nfc(&slashed) {
        slashed
    } else {
        slashed.nfc().collect()
    }
}

/// Convert a wire-form path to native form.
pub fn native_filename(wire: &str) -> String {
    if cfg!(windows) {
        wire.replace('/', "\\")
    } else if cfg!(target_os = "macos") {
        wire.nfd().collect()
    } else {
        wire.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NFC_E_ACUTE: &str = "caf\u{e9}";
    const NFD_E_ACUTE: &str = "cafe\u{301}";

    #[test]
    fn decomposed_input_is_composed() {
        assert_eq!(normalized_filename(NFD_E_ACUTE), NFC_E_ACUTE);
    }

    #[test]
    fn ascii_is_untouched() {
        assert_eq!(normalized_filename("docs/a.txt"), "docs/a.txt");
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        let once = normalized_filename(NFD_E_ACUTE);
        assert_eq!(normalized_filename(&once), once);
    }

    #[cfg(windows)]
    #[test]
    fn windows_separators_are_swapped() {
        assert_eq!(normalized_filename("a\\b\\c"), "a/b/c");
        assert_eq!(native_filename("a/b/c"), "a\\b\\c");
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn macos_native_form_is_decomposed() {
        assert_eq!(native_filename(NFC_E_ACUTE), NFD_E_ACUTE);
    }

    #[cfg(all(not(windows), not(target_os = "macos")))]
    #[test]
    fn native_form_is_identity_elsewhere() {
        assert_eq!(native_filename(NFC_E_ACUTE), NFC_E_ACUTE);
        assert_eq!(native_filename("a/b"), "a/b");
    }

    proptest! {
        /// Normalizing is idempotent on arbitrary input.
        #[test]
        fn prop_normalize_idempotent(s in "\\PC{0,24}") {
            let wire = normalized_filename(&s);
            prop_assert_eq!(normalized_filename(&wire), wire);
        }

        /// A name already in native form survives a trip through wire form.
        #[test]
        fn prop_native_roundtrip(s in "[a-zA-Z0-9_/ \u{e0}-\u{ff}\u{300}-\u{36f}]{0,24}") {
            let wire = normalized_filename(&s);
            let native = native_filename(&wire);
            prop_assert_eq!(normalized_filename(&native), wire.clone());
            prop_assert_eq!(native_filename(&normalized_filename(&native)), native);
        }
    }
}
