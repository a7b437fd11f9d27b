use aleph_types::ContentId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so identical bytes hashed for different purposes never share
/// an id. Ids are rendered as lowercase hex.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for raw data objects served over remote fetch.
    pub const DATA: Self = Self {
        domain: "aleph-data-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentId::new(hasher.finalize().to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let id1 = ContentHasher::DATA.hash(b"hello world");
        let id2 = ContentHasher::DATA.hash(b"hello world");
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str().len(), 64);
    }

    #[test]
    fn different_content_produces_different_ids() {
        assert_ne!(ContentHasher::DATA.hash(b"original"), ContentHasher::DATA.hash(b"tampered"));
    }

    #[test]
    fn domain_tag_separates_from_plain_blake3() {
        let plain = blake3::hash(b"same").to_hex().to_string();
        assert_ne!(ContentHasher::DATA.hash(b"same").as_str(), plain);
    }
}
