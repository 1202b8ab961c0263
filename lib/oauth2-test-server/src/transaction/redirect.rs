use std::borrow::Cow;

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;

use super::TestAssertionError;

/// Decoded query string parameters, an ordered multi-map.
///
/// Keys keep the order of their first occurrence, repeated keys keep every value in
/// order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    entries: IndexMap<String, Vec<String>>,
}

impl QueryParameters {
    /// Decodes a raw query string (without the leading `?`).
    ///
    /// Segments are separated by `&`; empty segments and segments without `=` are
    /// ignored. Keys and values are percent-decoded, `+` stands for a space.
    ///
    /// # Errors
    ///
    /// Returns [`TestAssertionError::MalformedQuery`] if an escape sequence does not
    /// decode to UTF-8.
    pub fn parse(query: &str) -> Result<Self, TestAssertionError> {
        let mut result = Self::default();
        for segment in query.split('&').filter(|segment| !segment.is_empty()) {
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            let key = unescape(segment, key)?;
            let value = unescape(segment, value)?;
            result.append(key, value);
        }
        Ok(result)
    }

    /// Adds a value for `key`, after any existing ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// Returns the first value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value of `key`, empty if the key is absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there is no parameter.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over every `(key, value)` pair, grouped by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }
}

fn unescape(segment: &str, raw: &str) -> Result<String, TestAssertionError> {
    let raw: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    percent_decode_str(&raw)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|err| TestAssertionError::MalformedQuery {
            segment: segment.to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_pairs() {
        let params = QueryParameters::parse("code=XYZ&state=foo").expect("valid query");

        assert_eq!(params.get("code"), Some("XYZ"));
        assert_eq!(params.get("state"), Some("foo"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn should_unescape_keys_and_values() {
        let params = QueryParameters::parse("redirect%5Furi=http%3A%2F%2Fgamma.com%2Freturn&state=a+b%20c")
            .expect("valid query");

        assert_eq!(params.get("redirect_uri"), Some("http://gamma.com/return"));
        assert_eq!(params.get("state"), Some("a b c"));
    }

    #[test]
    fn should_keep_duplicates_in_order() {
        let params = QueryParameters::parse("scope=read&code=1&scope=write").expect("valid query");

        assert_eq!(params.get("scope"), Some("read"));
        assert_eq!(params.get_all("scope"), ["read", "write"]);
        let pairs = params.iter().collect::<Vec<_>>();
        assert_eq!(pairs, vec![
            ("scope", "read"),
            ("scope", "write"),
            ("code", "1")
        ]);
    }

    #[test]
    fn should_skip_empty_and_valueless_segments() {
        let params = QueryParameters::parse("&flag&empty=&code=1&&").expect("valid query");

        assert!(!params.contains_key("flag"));
        assert_eq!(params.get("empty"), Some(""));
        assert_eq!(params.get("code"), Some("1"));
    }

    #[test]
    fn should_split_on_first_equal_sign_only() {
        let params = QueryParameters::parse("state=a=b").expect("valid query");

        assert_eq!(params.get("state"), Some("a=b"));
    }

    #[test]
    fn should_reject_invalid_utf8_escape() {
        let result = QueryParameters::parse("code=%FF%FE");

        assert!(matches!(
            result,
            Err(TestAssertionError::MalformedQuery { segment, .. }) if segment == "code=%FF%FE"
        ));
    }

    #[test]
    fn should_answer_empty_for_missing_key() {
        let params = QueryParameters::default();

        assert!(params.is_empty());
        assert_eq!(params.get("code"), None);
        assert!(params.get_all("code").is_empty());
    }
}
