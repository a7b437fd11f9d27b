use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string without validation.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// The raw string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Consume the wrapper and return the raw string.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Primary key of a statement.
    ///
    /// Structurally `<publisherRoot>:<publisher>:<sequence>`, but stores and
    /// indices treat it as an opaque string.
    StatementId
);

string_id!(
    /// Identifier naming a data object's bytes.
    ///
    /// Opaque to every component that moves data; only the producing store
    /// knows how it was derived.
    #[derive(Default)]
    ContentId
);

string_id!(
    /// Identifier of a peer node.
    PeerId
);

impl StatementId {
    /// Build `<root>:<publisher>:<sequence>`.
    pub fn compose(root: &PeerId, publisher: &str, sequence: u64) -> Self {
        Self(format!("{root}:{publisher}:{sequence}"))
    }

    /// Split into `(root, publisher, sequence)`.
    ///
    /// The sequence is the text after the last `:` and the root is the text
    /// before the first one; anything in between is the publisher.
    pub fn parts(&self) -> Result<(&str, &str, u64), TypeError> {
        let invalid = || TypeError::InvalidStatementId(self.0.clone());
        let (head, seq) = self.0.rsplit_once(':').ok_or_else(invalid)?;
        let (root, publisher) = head.split_once(':').ok_or_else(invalid)?;
        if root.is_empty() || publisher.is_empty() {
            return Err(invalid());
        }
        let sequence = seq.parse::<u64>().map_err(|_| invalid())?;
        Ok((root, publisher, sequence))
    }
}

impl PeerId {
    /// Derive a peer id from raw public key bytes (lowercase hex).
    pub fn from_public_key(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Decode back to public key bytes.
    pub fn to_public_key_bytes(&self) -> Result<Vec<u8>, TypeError> {
        hex::decode(&self.0).map_err(|e| TypeError::InvalidHex(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn compose_and_parse() {
        let id = StatementId::compose(&PeerId::from("QmF001234"), "foo", 5678);
        assert_eq!(id.as_str(), "QmF001234:foo:5678");
        assert_eq!(id.parts().unwrap(), ("QmF001234", "foo", 5678));
    }

    #[test]
    fn publisher_may_contain_colons() {
        let id = StatementId::from("root:pub:lisher:3");
        assert_eq!(id.parts().unwrap(), ("root", "pub:lisher", 3));
    }

    #[test]
    fn malformed_ids_rejected() {
        for raw in ["", "abc", "a:b", "a:b:c", ":b:1", "a::1"] {
            assert!(StatementId::from(raw).parts().is_err(), "{raw} should fail");
        }
    }

    #[test]
    fn serde_is_transparent() {
        let id = ContentId::from("QmF00123456789");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"QmF00123456789\"");
    }

    #[test]
    fn peer_id_hex_roundtrip() {
        let peer = PeerId::from_public_key(&[0xab, 0xcd]);
        assert_eq!(peer.as_str(), "abcd");
        assert_eq!(peer.to_public_key_bytes().unwrap(), vec![0xab, 0xcd]);
        assert!(PeerId::from("zz").to_public_key_bytes().is_err());
    }

    proptest! {
        #[test]
        fn composed_ids_parse_back(
            root in "[A-Za-z0-9]{1,16}",
            publisher in "[a-z]{1,8}",
            seq in any::<u64>(),
        ) {
            let id = StatementId::compose(&PeerId::new(root.clone()), &publisher, seq);
            let (r, p, s) = id.parts().unwrap();
            prop_assert_eq!(r, root.as_str());
            prop_assert_eq!(p, publisher.as_str());
            prop_assert_eq!(s, seq);
        }
    }
}
