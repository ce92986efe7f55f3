//! Structured header values: `value; key=value; key="quoted value"`.
//!
//! The parameter tail is scanned one character at a time. A backslash
//! escapes the next character in every state. Either quote character opens
//! a quoted run which only the same character closes. RFC 2231 continuation
//! keys (`name*0`, `name*1`, ...) are joined under the bare name in the
//! order they appear; out-of-order fragments are not reordered.

use crate::rfc2047::decode_encoded_words;

/// Ordered parameter map.
///
/// Each parameter is stored under its original spelling and under a
/// lower-cased alias, so `get("charset")` finds `Charset=utf-8`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a parameter by exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a parameter, replacing any existing value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the number of stored keys, aliases included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no parameters are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over keys and values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn set_with_alias(&mut self, key: &str, value: &str) {
        self.insert(key, value);
        self.insert(key.to_lowercase(), value);
    }

    fn append(&mut self, key: &str, fragment: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => existing.push_str(fragment),
            None => self.entries.push((key.to_string(), fragment.to_string())),
        }
    }

    /// Stores a completed `key=value` pair, joining continuation fragments.
    fn emit(&mut self, key: &str, value: &str) {
        if let Some(base) = continuation_base(key) {
            if self.get(base).is_some() {
                self.append(base, value);
                let lower = base.to_lowercase();
                if lower != base {
                    self.append(&lower, value);
                }
                return;
            }
            self.set_with_alias(base, value);
        } else {
            self.set_with_alias(key, value);
        }
    }

    fn map_values(&mut self, f: impl Fn(&str) -> String) {
        for (_, value) in &mut self.entries {
            *value = f(value);
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Parameters {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

/// Returns `name` for a continuation key `name*<digits>`.
fn continuation_base(key: &str) -> Option<&str> {
    let without_digits = key.trim_end_matches(|c: char| c.is_ascii_digit());
    if without_digits.len() == key.len() {
        return None;
    }
    without_digits.strip_suffix('*')
}

/// A header value split into its primary value and parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedValue {
    /// Text before the first unquoted `;`, trimmed.
    pub value: String,
    /// Parameters from the tail.
    pub parameters: Parameters,
}

/// Scanner state for the parameter tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Reading a parameter name.
    Key,
    /// Reading an unquoted value, or the text after a closing quote.
    Value,
    /// Inside a run opened by the given quote character.
    Quoted(char),
}

/// Parses a structured header value.
///
/// When `decode_headers` is set the primary value and every parameter value
/// go through RFC 2047 decoding.
#[must_use]
pub fn parse_header_value(input: &str, decode_headers: bool) -> ParsedValue {
    let decode = |s: &str| {
        if decode_headers {
            decode_encoded_words(s)
        } else {
            s.to_string()
        }
    };

    let Some(split) = first_unquoted_semicolon(input) else {
        return ParsedValue {
            value: decode(input).trim().to_string(),
            parameters: Parameters::new(),
        };
    };

    let value = decode(&input[..split]).trim().to_string();
    let tail = input[split + 1..].trim();
    let mut parameters = scan_parameters(tail);
    if decode_headers {
        parameters.map_values(decode_encoded_words);
    }

    ParsedValue { value, parameters }
}

fn first_unquoted_semicolon(input: &str) -> Option<usize> {
    let mut quoted = false;
    let mut escaped = false;
    for (idx, c) in input.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => return Some(idx),
            _ => {}
        }
    }
    // An unmatched quote does not hide the parameters.
    if quoted { input.find(';') } else { None }
}

fn scan_parameters(tail: &str) -> Parameters {
    let mut parameters = Parameters::new();
    let mut state = State::Key;
    let mut key = String::new();
    let mut value = String::new();
    let mut after_quote = false;

    let mut chars = tail.chars();
    while let Some(mut c) = chars.next() {
        let mut escaped = false;
        if c == '\\' {
            let Some(next) = chars.next() else { break };
            c = next;
            escaped = true;
        }

        state = match (state, c) {
            (State::Key, '=') if !escaped => {
                key = key.trim().to_string();
                value.clear();
                State::Value
            }
            (State::Key, ';') if !escaped => {
                let bare = key.trim();
                if !bare.is_empty() {
                    parameters.set_with_alias(bare, "");
                }
                key.clear();
                State::Key
            }
            (State::Key, _) => {
                key.push(c);
                State::Key
            }
            (State::Value, ' ' | '\t') if !escaped && (value.is_empty() || after_quote) => {
                State::Value
            }
            (State::Value, '"' | '\'') if !escaped => {
                value = value.trim().to_string();
                State::Quoted(c)
            }
            (State::Value, ';') if !escaped => {
                parameters.emit(&key, value.trim());
                key.clear();
                value.clear();
                after_quote = false;
                State::Key
            }
            (State::Value, _) => {
                value.push(c);
                State::Value
            }
            (State::Quoted(quote), _) if c == quote && !escaped => {
                after_quote = true;
                State::Value
            }
            (State::Quoted(quote), _) => {
                value.push(c);
                State::Quoted(quote)
            }
        };
    }

    match state {
        State::Key => {
            let bare = key.trim();
            if !bare.is_empty() {
                parameters.set_with_alias(bare, "");
            }
        }
        State::Value | State::Quoted(_) => parameters.emit(key.trim(), value.trim()),
    }

    parameters
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_value_without_parameters() {
        let parsed = parse_header_value("  text/plain ", false);
        assert_eq!(parsed.value, "text/plain");
        assert!(parsed.parameters.is_empty());
    }

    #[test]
    fn test_simple_parameters() {
        let parsed = parse_header_value("text/plain; charset=utf-8; format=flowed", false);
        assert_eq!(parsed.value, "text/plain");
        assert_eq!(parsed.parameters.get("charset"), Some("utf-8"));
        assert_eq!(parsed.parameters.get("format"), Some("flowed"));
    }

    #[test]
    fn test_lowercase_alias() {
        let parsed = parse_header_value("text/plain; Charset=UTF-8", false);
        assert_eq!(parsed.parameters.get("Charset"), Some("UTF-8"));
        assert_eq!(parsed.parameters.get("charset"), Some("UTF-8"));
        assert_eq!(parsed.parameters.len(), 2);
    }

    #[test]
    fn test_quoted_value_keeps_separators() {
        let parsed = parse_header_value(
            r#"attachment; filename="a; b = c.txt"; size=10"#,
            false,
        );
        assert_eq!(parsed.value, "attachment");
        assert_eq!(parsed.parameters.get("filename"), Some("a; b = c.txt"));
        assert_eq!(parsed.parameters.get("size"), Some("10"));
    }

    #[test]
    fn test_single_quotes() {
        let parsed = parse_header_value("x; name='it is'", false);
        assert_eq!(parsed.parameters.get("name"), Some("it is"));
    }

    #[test]
    fn test_quote_of_other_kind_inside_quotes() {
        let parsed = parse_header_value(r#"x; name="O'Brien.txt""#, false);
        assert_eq!(parsed.parameters.get("name"), Some("O'Brien.txt"));
    }

    #[test]
    fn test_escaped_quote_inside_quotes() {
        let parsed = parse_header_value(r#"x; name="say \"hi\"!"; y=1"#, false);
        assert_eq!(parsed.parameters.get("name"), Some(r#"say "hi"!"#));
        assert_eq!(parsed.parameters.get("y"), Some("1"));
    }

    #[test]
    fn test_escaped_semicolon_unquoted() {
        let parsed = parse_header_value(r"x; a=1\;2; b=3", false);
        assert_eq!(parsed.parameters.get("a"), Some("1;2"));
        assert_eq!(parsed.parameters.get("b"), Some("3"));
    }

    #[test]
    fn test_whitespace_after_equals_and_quote_skipped() {
        let parsed = parse_header_value("x; a =  \t value ; b=\"q\"  ;", false);
        assert_eq!(parsed.parameters.get("a"), Some("value"));
        assert_eq!(parsed.parameters.get("b"), Some("q"));
    }

    #[test]
    fn test_key_without_value() {
        let parsed = parse_header_value("x; flag; a=1; last", false);
        assert_eq!(parsed.parameters.get("flag"), Some(""));
        assert_eq!(parsed.parameters.get("a"), Some("1"));
        assert_eq!(parsed.parameters.get("last"), Some(""));
    }

    #[test]
    fn test_unterminated_quote_is_flushed() {
        let parsed = parse_header_value(r#"x; name="never closed; still value"#, false);
        assert_eq!(parsed.parameters.get("name"), Some("never closed; still value"));
    }

    #[test]
    fn test_trailing_backslash_is_dropped() {
        let parsed = parse_header_value(r"x; a=b\", false);
        assert_eq!(parsed.parameters.get("a"), Some("b"));
    }

    #[test]
    fn test_rfc2231_continuation() {
        let parsed = parse_header_value(
            r#"attachment; filename*0="long_"; filename*1="file"; filename*2=".txt""#,
            false,
        );
        assert_eq!(parsed.parameters.get("filename"), Some("long_file.txt"));
        assert_eq!(parsed.parameters.get("filename*1"), None);
    }

    #[test]
    fn test_rfc2231_continuation_mixed_case() {
        let parsed = parse_header_value("x; Name*0=ab; Name*1=cd", false);
        assert_eq!(parsed.parameters.get("Name"), Some("abcd"));
        assert_eq!(parsed.parameters.get("name"), Some("abcd"));
    }

    #[test]
    fn test_rfc2231_fragments_are_not_reordered() {
        let parsed = parse_header_value("x; n*1=second; n*0=first", false);
        assert_eq!(parsed.parameters.get("n"), Some("secondfirst"));
    }

    #[test]
    fn test_semicolon_inside_quoted_primary_value() {
        let parsed = parse_header_value(r#""a;b"; c=d"#, false);
        assert_eq!(parsed.value, r#""a;b""#);
        assert_eq!(parsed.parameters.get("c"), Some("d"));
    }

    #[test]
    fn test_unmatched_quote_in_primary_value() {
        let parsed = parse_header_value("text/plain\" ; charset=us-ascii", false);
        assert_eq!(parsed.value, "text/plain\"");
        assert_eq!(parsed.parameters.get("charset"), Some("us-ascii"));

        let parsed = parse_header_value("\"attachment; filename=a.txt", false);
        assert_eq!(parsed.value, "\"attachment");
        assert_eq!(parsed.parameters.get("filename"), Some("a.txt"));
    }

    #[test]
    fn test_encoded_words_decoded_when_enabled() {
        let raw = "=?utf-8?Q?inline?=; filename=\"=?utf-8?B?w6kudHh0?=\"";
        let decoded = parse_header_value(raw, true);
        assert_eq!(decoded.value, "inline");
        assert_eq!(decoded.parameters.get("filename"), Some("é.txt"));

        let raw_kept = parse_header_value(raw, false);
        assert_eq!(raw_kept.value, "=?utf-8?Q?inline?=");
        assert_eq!(
            raw_kept.parameters.get("filename"),
            Some("=?utf-8?B?w6kudHh0?=")
        );
    }

    #[test]
    fn test_last_duplicate_wins() {
        let parsed = parse_header_value("x; a=1; a=2", false);
        assert_eq!(parsed.parameters.get("a"), Some("2"));
        assert_eq!(parsed.parameters.len(), 1);
    }

    #[test]
    fn test_empty_tail() {
        let parsed = parse_header_value("text/plain;  ", false);
        assert_eq!(parsed.value, "text/plain");
        assert!(parsed.parameters.is_empty());
    }
}
