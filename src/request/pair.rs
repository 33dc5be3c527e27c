//! Ordered key/value entries used for query parameters and headers.
//!
//! An entry keeps every candidate value it was given, but only the last one
//! is ever sent. Values that render as `""`, `"0"` or `"false"` are dropped
//! from the outgoing request altogether, which lets callers pass optional
//! settings straight through without branching.

use std::fmt;

/// A loosely typed candidate value for a query parameter or header.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text, sent verbatim.
    Text(String),
    /// Signed integer, sent in decimal.
    Int(i64),
    /// Unsigned integer, sent in decimal.
    Uint(u64),
    /// Floating point number, sent in shortest form. Exponents below -4 or
    /// from 21 up switch to `1e+21` / `1e-07` notation; `0.0` renders as `"0"`.
    Float(f64),
    /// Boolean, sent as `"true"` / `"false"`.
    Bool(bool),
    /// Raw bytes, sent as (lossy) UTF-8.
    Bytes(Vec<u8>),
}

impl Value {
    /// Renders the value the way it appears on the wire.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Int(n) => n.to_string(),
            Self::Uint(n) => n.to_string(),
            Self::Float(n) => render_float(*n),
            Self::Bool(b) => b.to_string(),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

macro_rules! value_from_int {
    ($variant:ident, $wide:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Self::$variant(<$wide>::from(value))
                }
            }
        )*
    };
}

value_from_int!(Int, i64: i8, i16, i32, i64);
value_from_int!(Uint, u64: u8, u16, u32, u64);

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Uint(value as u64)
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Self {
        Self::Int(value as i64)
    }
}

fn render_float(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let scientific = format!("{n:e}");
    let Some((mantissa, exp)) = scientific.split_once('e') else {
        return n.to_string();
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..21).contains(&exp) {
        n.to_string()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
    }
}

/// Returns true when a rendered value must not be emitted.
#[must_use]
pub fn is_omitted(rendered: &str) -> bool {
    matches!(rendered, "" | "0" | "false")
}

/// One query parameter or header entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    key: String,
    values: Vec<Value>,
}

impl Pair {
    /// Creates an entry from a key and its candidate values.
    #[must_use]
    pub fn new(key: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    /// The entry key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// All candidate values, in the order given.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The value that will be sent: the last candidate, rendered, unless the
    /// omission rule drops it.
    #[must_use]
    pub fn effective_value(&self) -> Option<String> {
        let rendered = self.values.last().map(Value::render).unwrap_or_default();
        (!is_omitted(&rendered)).then_some(rendered)
    }
}

/// Ordered, possibly duplicate-keyed list of entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairList {
    entries: Vec<Pair>,
}

impl PairList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, pair: Pair) {
        self.entries.push(pair);
    }

    /// Number of entries, including ones the omission rule will drop.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Pair> {
        self.entries.iter()
    }

    /// Iterates `(key, value)` for every entry that survives the omission rule.
    pub fn effective(&self) -> impl Iterator<Item = (&str, String)> {
        self.entries
            .iter()
            .filter_map(|pair| pair.effective_value().map(|value| (pair.key(), value)))
    }
}

impl<'a> IntoIterator for &'a PairList {
    type Item = &'a Pair;
    type IntoIter = std::slice::Iter<'a, Pair>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Canonicalizes a header key: first letter and letters after `-` upper
/// case, the rest lower case (`content-type` → `Content-Type`).
///
/// Keys containing a space or any byte that is not an HTTP token character
/// are returned unchanged.
#[must_use]
pub fn canonical_header_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }
    let mut upper = true;
    key.chars()
        .map(|ch| {
            let mapped = if upper {
                ch.to_ascii_uppercase()
            } else {
                ch.to_ascii_lowercase()
            };
            upper = ch == '-';
            mapped
        })
        .collect()
}

fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_rendering() {
        assert_eq!(Value::from("abc").render(), "abc");
        assert_eq!(Value::from(42).render(), "42");
        assert_eq!(Value::from(-7i64).render(), "-7");
        assert_eq!(Value::from(7u8).render(), "7");
        assert_eq!(Value::from(true).render(), "true");
        assert_eq!(Value::from(0.0).render(), "0");
        assert_eq!(Value::from(1.5).render(), "1.5");
        assert_eq!(Value::from(b"raw".as_slice()).render(), "raw");
    }

    #[test]
    fn test_float_rendering_switches_to_exponent() {
        assert_eq!(Value::from(1e21).render(), "1e+21");
        assert_eq!(Value::from(1e20).render(), "100000000000000000000");
        assert_eq!(Value::from(1e-7).render(), "1e-07");
        assert_eq!(Value::from(0.0001).render(), "0.0001");
        assert_eq!(Value::from(-2.5e-5).render(), "-2.5e-05");
        assert_eq!(Value::from(1.25e300).render(), "1.25e+300");
        assert_eq!(Value::from(f64::INFINITY).render(), "+Inf");
        assert_eq!(Value::from(f64::NAN).render(), "NaN");
    }

    #[test]
    fn test_omission_rule() {
        assert!(is_omitted(""));
        assert!(is_omitted("0"));
        assert!(is_omitted("false"));
        assert!(!is_omitted("  "));
        assert!(!is_omitted("00"));
        assert!(!is_omitted("FALSE"));
    }

    #[test]
    fn test_effective_value_uses_last_candidate() {
        let pair = Pair::new("k", vec![Value::from("a"), Value::from("b"), Value::from(3)]);
        assert_eq!(pair.effective_value(), Some("3".to_string()));
    }

    #[test]
    fn test_effective_value_last_falsy_candidate_drops_entry() {
        let pair = Pair::new("k", vec![Value::from("keep"), Value::from(false)]);
        assert_eq!(pair.effective_value(), None);
    }

    #[test]
    fn test_effective_value_without_candidates_is_omitted() {
        let pair = Pair::new("k", Vec::new());
        assert_eq!(pair.effective_value(), None);
    }

    #[test]
    fn test_effective_value_zero_int_omitted_whitespace_kept() {
        assert_eq!(Pair::new("k", vec![Value::from(0)]).effective_value(), None);
        assert_eq!(
            Pair::new("k", vec![Value::from("  ")]).effective_value(),
            Some("  ".to_string())
        );
    }

    #[test]
    fn test_pair_list_effective_preserves_order_and_duplicates() {
        let mut list = PairList::new();
        list.push(Pair::new("tag", vec![Value::from("a")]));
        list.push(Pair::new("skip", vec![Value::from("")]));
        list.push(Pair::new("tag", vec![Value::from("b")]));

        let effective: Vec<_> = list.effective().collect();
        assert_eq!(
            effective,
            vec![("tag", "a".to_string()), ("tag", "b".to_string())]
        );
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_canonical_header_key() {
        assert_eq!(canonical_header_key("content-type"), "Content-Type");
        assert_eq!(canonical_header_key("USER-AGENT"), "User-Agent");
        assert_eq!(canonical_header_key("x-api-key"), "X-Api-Key");
        assert_eq!(canonical_header_key("etag"), "Etag");
    }

    #[test]
    fn test_canonical_header_key_leaves_invalid_keys_alone() {
        assert_eq!(canonical_header_key("bad key"), "bad key");
        assert_eq!(canonical_header_key("emoji-\u{1f600}"), "emoji-\u{1f600}");
    }
}
