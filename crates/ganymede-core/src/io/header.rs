use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A typed header value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HeaderValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for HeaderValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(b: bool) -> Self {
        Self::Logical(b)
    }
}

/// One keyword record: value plus optional inline comment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderCard {
    pub value: HeaderValue,
    pub comment: Option<String>,
}

/// Ordered keyword -> value mapping describing an exposure.
///
/// Keywords are stored upper-cased. Insertion order is preserved so a header
/// read from disk is written back in the same order; `set` on an existing
/// keyword keeps its position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    cards: IndexMap<String, HeaderCard>,
    /// COMMENT and HISTORY records, kept in order.
    commentary: Vec<(String, String)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite `key` if present, append it otherwise.
    pub fn set(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let key = key.to_ascii_uppercase();
        match self.cards.get_mut(&key) {
            Some(card) => card.value = value.into(),
            None => {
                self.cards.insert(
                    key,
                    HeaderCard {
                        value: value.into(),
                        comment: None,
                    },
                );
            }
        }
    }

    /// Like `set`, but also replaces the inline comment.
    pub fn set_with_comment(&mut self, key: &str, value: impl Into<HeaderValue>, comment: &str) {
        self.cards.insert(
            key.to_ascii_uppercase(),
            HeaderCard {
                value: value.into(),
                comment: Some(comment.to_string()),
            },
        );
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        self.cards
            .shift_remove(&key.to_ascii_uppercase())
            .map(|card| card.value)
    }

    pub fn push_commentary(&mut self, keyword: &str, text: &str) {
        self.commentary
            .push((keyword.to_ascii_uppercase(), text.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards
            .get(&key.to_ascii_uppercase())
            .map(|card| &card.value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(HeaderValue::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cards.contains_key(&key.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Keyword cards in order.
    pub fn cards(&self) -> impl Iterator<Item = (&str, &HeaderCard)> {
        self.cards.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn commentary(&self) -> &[(String, String)] {
        &self.commentary
    }
}
