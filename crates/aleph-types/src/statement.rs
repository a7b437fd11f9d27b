use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{ContentId, StatementId};

/// Body of a statement.
///
/// A closed sum type: new statement shapes are new variants, never optional
/// fields on an existing one. Serialized externally tagged, so a simple body
/// reads as `{"simple": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementBody {
    Simple(SimpleStatement),
}

/// The `simple` statement body: one object plus its index keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleStatement {
    /// Content id of the referenced data object.
    pub object: ContentId,
    /// Well-known identifiers this statement is indexed by, in order.
    #[serde(default)]
    pub refs: Vec<String>,
    /// Free-text labels. Not indexed.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Statements this one depends on. Informational only.
    #[serde(default)]
    pub deps: Vec<StatementId>,
}

impl SimpleStatement {
    pub fn new(object: impl Into<ContentId>) -> Self {
        Self {
            object: object.into(),
            ..Self::default()
        }
    }

    pub fn with_ref(mut self, wki: impl Into<String>) -> Self {
        self.refs.push(wki.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_dep(mut self, dep: impl Into<StatementId>) -> Self {
        self.deps.push(dep.into());
        self
    }
}

impl StatementBody {
    /// WKIs declared by this body.
    pub fn refs(&self) -> &[String] {
        match self {
            Self::Simple(simple) => &simple.refs,
        }
    }

    /// Content id of the data object this body points at.
    pub fn object(&self) -> &ContentId {
        match self {
            Self::Simple(simple) => &simple.object,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple",
        }
    }
}

impl From<SimpleStatement> for StatementBody {
    fn from(simple: SimpleStatement) -> Self {
        Self::Simple(simple)
    }
}

/// A signed, namespaced assertion referencing a content-addressed object.
///
/// Stores persist statements exactly as given: the signature is carried, not
/// checked, and no field is normalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    pub publisher: String,
    pub namespace: String,
    pub body: StatementBody,
    /// Creation time in milliseconds since the Unix epoch, as supplied.
    pub timestamp: i64,
    #[serde(with = "hex_bytes", default)]
    pub signature: Vec<u8>,
}

impl Statement {
    /// Structural well-formedness: every required field is present.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.id.is_empty() {
            return Err(TypeError::MissingField("id"));
        }
        if self.publisher.is_empty() {
            return Err(TypeError::MissingField("publisher"));
        }
        if self.namespace.is_empty() {
            return Err(TypeError::MissingField("namespace"));
        }
        if self.body.object().is_empty() {
            return Err(TypeError::MissingField("body.object"));
        }
        Ok(())
    }

    pub fn refs(&self) -> &[String] {
        self.body.refs()
    }

    pub fn object(&self) -> &ContentId {
        self.body.object()
    }
}

/// A statement before the publishing peer assigns its id and signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementDraft {
    pub publisher: String,
    pub namespace: String,
    pub body: StatementBody,
    pub timestamp: i64,
}

impl StatementDraft {
    pub fn into_statement(self, id: StatementId, signature: Vec<u8>) -> Statement {
        Statement {
            id,
            publisher: self.publisher,
            namespace: self.namespace,
            body: self.body,
            timestamp: self.timestamp,
            signature,
        }
    }
}

/// Hex encoding for byte fields, so statements read well as JSON.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
