/// Maps logical document ids to physical object keys and back.
///
/// A key is `prefix + percent_encode(id) + suffix`. Keys that do not have this
/// shape decode to `None` and are skipped by listings.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCodec {
    prefix: String,
    suffix: String,
}

pub const DEFAULT_SUFFIX: &str = ".json";

impl KeyCodec {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        KeyCodec {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// A codec for JSON documents stored under `prefix`.
    pub fn json(prefix: impl Into<String>) -> Self {
        Self::new(prefix, DEFAULT_SUFFIX)
    }

    pub fn key_for(&self, id: &str) -> String {
        format!("{}{}{}", self.prefix, urlencoding::encode(id), self.suffix)
    }

    pub fn id_for(&self, key: &str) -> Option<String> {
        let encoded = key
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if encoded.is_empty() {
            return None;
        }
        urlencoding::decode(encoded).ok().map(|id| id.into_owned())
    }

    /// Physical listing prefix for all ids starting with `id_prefix`.
    pub fn list_prefix(&self, id_prefix: &str) -> String {
        format!("{}{}", self.prefix, urlencoding::encode(id_prefix))
    }
}
