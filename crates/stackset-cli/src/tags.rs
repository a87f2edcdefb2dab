use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Parse `key=value,key2=value2` into tags, keeping input order.
///
/// Entries split on the first `=`; an entry without one gets an empty value.
/// Neither `,` nor `=` can be escaped, so values containing them are not
/// representable.
pub fn encode(input: Option<&str>) -> Vec<Tag> {
    let Some(input) = input else {
        return Vec::new();
    };
    input
        .split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((k, v)) => Tag::new(k, v),
            None => Tag::new(entry, ""),
        })
        .collect()
}

/// Inverse of [`encode`] for tags without embedded delimiters.
pub fn decode(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| format!("{}={}", t.key, t.value))
        .collect::<Vec<_>>()
        .join(",")
}

fn canonical(tags: &[Tag]) -> String {
    // Serializing a slice of plain strings cannot fail.
    serde_json::to_string(tags).unwrap_or_default()
}

/// Order-sensitive structural equality of two tag sets.
pub fn equals(a: &[Tag], b: &[Tag]) -> bool {
    canonical(a) == canonical(b)
}
