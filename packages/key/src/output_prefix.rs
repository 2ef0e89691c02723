//! Output prefix framing that identifies which key produced an output
//!
//! | Kind      | Prefix                          | Input marker |
//! |-----------|---------------------------------|--------------|
//! | `Tink`    | `0x01 \|\| be32(key_id)`        | none         |
//! | `Legacy`  | `0x00 \|\| be32(key_id)`        | `0x00` appended to MAC/signature input |
//! | `Crunchy` | `0x00 \|\| be32(key_id)`        | none         |
//! | `Raw`     | empty                           | none         |

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Size of every non-empty output prefix
pub const NON_RAW_PREFIX_SIZE: usize = 5;

/// Leading byte of `Tink` prefixes
pub const TINK_START_BYTE: u8 = 0x01;

/// Leading byte of `Legacy` and `Crunchy` prefixes
pub const LEGACY_START_BYTE: u8 = 0x00;

/// Byte appended to MAC and signature input for `Legacy` keys
pub const LEGACY_FORMAT_MARKER: u8 = 0x00;

/// How a key frames its ciphertexts, tags and signatures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputPrefixKind {
    /// `0x01 || key_id`
    Tink,
    /// `0x00 || key_id`, with the format marker mixed into MAC/signature input
    Legacy,
    /// `0x00 || key_id`
    Crunchy,
    /// No prefix
    Raw,
}

impl OutputPrefixKind {
    /// Compute the prefix this kind produces for `key_id`
    #[must_use]
    pub fn prefix(self, key_id: u32) -> OutputPrefix {
        let start = match self {
            Self::Tink => TINK_START_BYTE,
            Self::Legacy | Self::Crunchy => LEGACY_START_BYTE,
            Self::Raw => return OutputPrefix::Raw,
        };
        let id = key_id.to_be_bytes();
        OutputPrefix::Framed([start, id[0], id[1], id[2], id[3]])
    }

    /// Whether the legacy format marker is appended to MAC/signature input
    #[must_use]
    pub fn mixes_format_marker(self) -> bool {
        matches!(self, Self::Legacy)
    }

    /// The bytes a MAC or signature primitive actually sees for `data`
    #[must_use]
    pub fn framed_input(self, data: &[u8]) -> Cow<'_, [u8]> {
        if self.mixes_format_marker() {
            let mut marked = Vec::with_capacity(data.len() + 1);
            marked.extend_from_slice(data);
            marked.push(LEGACY_FORMAT_MARKER);
            Cow::Owned(marked)
        } else {
            Cow::Borrowed(data)
        }
    }
}

impl fmt::Display for OutputPrefixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tink => "TINK",
            Self::Legacy => "LEGACY",
            Self::Crunchy => "CRUNCHY",
            Self::Raw => "RAW",
        };
        f.write_str(name)
    }
}

/// Computed output prefix bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputPrefix {
    /// Empty prefix
    Raw,
    /// Five-byte prefix: start byte followed by the big-endian key id
    Framed([u8; NON_RAW_PREFIX_SIZE]),
}

impl OutputPrefix {
    /// Read the candidate prefix from the first five bytes of an input
    #[must_use]
    pub fn from_input(input: &[u8]) -> Option<Self> {
        let head = input.get(..NON_RAW_PREFIX_SIZE)?;
        let mut bytes = [0u8; NON_RAW_PREFIX_SIZE];
        bytes.copy_from_slice(head);
        Some(Self::Framed(bytes))
    }

    /// Prefix bytes (empty for `Raw`)
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Raw => &[],
            Self::Framed(bytes) => bytes,
        }
    }

    /// Number of prefix bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// True for the empty prefix
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Raw)
    }

    /// Prepend this prefix to `payload`
    #[must_use]
    pub fn frame(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() + payload.len());
        out.extend_from_slice(self.as_bytes());
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn tink_prefix_is_version_byte_and_big_endian_id() {
        let prefix = OutputPrefixKind::Tink.prefix(42);
        assert_eq!(prefix.as_bytes(), hex!("010000002a"));
        let prefix = OutputPrefixKind::Tink.prefix(0xdead_beef);
        assert_eq!(prefix.as_bytes(), hex!("01deadbeef"));
    }

    #[test]
    fn legacy_and_crunchy_share_prefix_bytes() {
        let legacy = OutputPrefixKind::Legacy.prefix(7);
        let crunchy = OutputPrefixKind::Crunchy.prefix(7);
        assert_eq!(legacy.as_bytes(), hex!("0000000007"));
        assert_eq!(legacy, crunchy);
        assert_ne!(legacy, OutputPrefixKind::Tink.prefix(7));
    }

    #[test]
    fn raw_prefix_is_empty() {
        let prefix = OutputPrefixKind::Raw.prefix(99);
        assert!(prefix.is_empty());
        assert_eq!(prefix.frame(b"abc"), b"abc");
    }

    #[test]
    fn only_legacy_mixes_format_marker() {
        assert_eq!(&*OutputPrefixKind::Legacy.framed_input(b"ab"), b"ab\x00");
        assert_eq!(&*OutputPrefixKind::Crunchy.framed_input(b"ab"), b"ab");
        assert_eq!(&*OutputPrefixKind::Tink.framed_input(b"ab"), b"ab");
        assert_eq!(&*OutputPrefixKind::Raw.framed_input(b"ab"), b"ab");
    }

    #[test]
    fn candidate_prefix_requires_five_bytes() {
        assert_eq!(OutputPrefix::from_input(&hex!("01000000")), None);
        assert_eq!(
            OutputPrefix::from_input(&hex!("010000002aff")),
            Some(OutputPrefixKind::Tink.prefix(42))
        );
    }
}
