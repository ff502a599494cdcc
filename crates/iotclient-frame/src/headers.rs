use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{FrameError, Result};

/// Look up a property value in a header block.
///
/// Finds the first occurrence of `name` immediately followed by `:` and
/// returns the text up to the next newline, NUL or end of input. This is a
/// plain substring search: a property whose name ends with `name` (say
/// `xname:`) that appears earlier in the block matches first. Use
/// [`Headers`] for exact, line-anchored lookups.
pub fn get_property<'a>(headers: &'a str, name: &str) -> Result<&'a str> {
    if name.is_empty() {
        return Err(FrameError::InvalidHeader("property name is empty".into()));
    }
    let needle = format!("{name}:");
    let start = headers
        .find(&needle)
        .map(|at| at + needle.len())
        .ok_or_else(|| FrameError::NotFound(name.to_string()))?;

    let value = &headers[start..];
    let end = value.find(['\n', '\0']).unwrap_or(value.len());
    Ok(&value[..end])
}

/// Copy a property value into a fixed-capacity buffer as a NUL-terminated string.
///
/// The value plus its terminator must fit in `buf`; otherwise nothing is
/// written and [`FrameError::BufferTooSmall`] is returned. Returns the value
/// length, excluding the terminator.
pub fn copy_property(headers: &str, name: &str, buf: &mut [u8]) -> Result<usize> {
    let value = get_property(headers, name)?;
    let needed = value.len() + 1;
    if needed > buf.len() {
        return Err(FrameError::BufferTooSmall {
            needed,
            capacity: buf.len(),
        });
    }
    buf[..value.len()].copy_from_slice(value.as_bytes());
    buf[value.len()] = 0;
    Ok(value.len())
}

/// An ordered set of header properties with exact-name lookup.
///
/// Each name appears once; inserting an existing name replaces its value in
/// place. Renders to the wire block with [`to_block`](Self::to_block).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a header block, stopping at the first empty line.
    ///
    /// When a name repeats, the first value wins, matching [`get_property`].
    pub fn parse(block: &str) -> Result<Self> {
        let mut headers = Self::new();
        for line in block.split('\n') {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::InvalidHeader(format!("missing ':' in {line:?}")))?;
            validate(name, value)?;
            if headers.get(name).is_some() {
                debug!(name, "ignoring repeated header");
                continue;
            }
            headers.entries.push((name.to_string(), value.to_string()));
        }
        Ok(headers)
    }

    /// Set `name` to `value`, replacing any existing value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate(&name, &value)?;

        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Value of the property named exactly `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// Remove a property, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(existing, _)| existing == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the wire block: one `name:value\n` line per property and a
    /// closing empty line.
    pub fn to_block(&self) -> String {
        let mut block = String::with_capacity(
            self.entries
                .iter()
                .map(|(name, value)| name.len() + value.len() + 2)
                .sum::<usize>()
                + 1,
        );
        for (name, value) in &self.entries {
            block.push_str(name);
            block.push(':');
            block.push_str(value);
            block.push('\n');
        }
        block.push('\n');
        block
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_block())
    }
}

impl FromStr for Headers {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn validate(name: &str, value: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FrameError::InvalidHeader("empty property name".into()));
    }
    if name.contains([':', '\n', '\0']) {
        return Err(FrameError::InvalidHeader(format!(
            "property name {name:?} contains a reserved character"
        )));
    }
    if value.contains(['\n', '\0']) {
        return Err(FrameError::InvalidHeader(format!(
            "value of {name:?} contains a line break or NUL"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "a:1\nb:22\n\n";

    #[test]
    fn get_property_finds_values() {
        assert_eq!(get_property(BLOCK, "a").unwrap(), "1");
        assert_eq!(get_property(BLOCK, "b").unwrap(), "22");
        assert!(matches!(
            get_property(BLOCK, "c"),
            Err(FrameError::NotFound(name)) if name == "c"
        ));
    }

    #[test]
    fn get_property_value_runs_to_end_or_nul() {
        assert_eq!(get_property("k:last", "k").unwrap(), "last");
        assert_eq!(get_property("k:v\0garbage", "k").unwrap(), "v");
        assert_eq!(get_property("k:\n", "k").unwrap(), "");
    }

    #[test]
    fn get_property_keeps_colons_in_value() {
        assert_eq!(
            get_property("url:http://hub:8080/x\n\n", "url").unwrap(),
            "http://hub:8080/x"
        );
    }

    #[test]
    fn get_property_substring_match_is_unanchored() {
        // "xa:" contains "a:" and comes first.
        assert_eq!(get_property("xa:9\na:1\n\n", "a").unwrap(), "9");
        assert_eq!(Headers::parse("xa:9\na:1\n\n").unwrap().get("a"), Some("1"));
    }

    #[test]
    fn get_property_rejects_empty_name() {
        assert!(matches!(
            get_property(BLOCK, ""),
            Err(FrameError::InvalidHeader(_))
        ));
    }

    #[test]
    fn copy_property_writes_value_and_terminator() {
        let mut buf = [0xEEu8; 8];
        let len = copy_property(BLOCK, "b", &mut buf).unwrap();
        assert_eq!(len, 2);
        assert_eq!(&buf[..3], b"22\0");
        assert_eq!(&buf[3..], &[0xEE; 5]);
    }

    #[test]
    fn copy_property_exact_fit() {
        let mut buf = [0u8; 3];
        assert_eq!(copy_property(BLOCK, "b", &mut buf).unwrap(), 2);
        assert_eq!(&buf, b"22\0");
    }

    #[test]
    fn copy_property_too_small_leaves_buffer_untouched() {
        let mut buf = [0xEEu8; 2];
        let err = copy_property(BLOCK, "b", &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferTooSmall {
                needed: 3,
                capacity: 2
            }
        ));
        assert_eq!(buf, [0xEE; 2]);
    }

    #[test]
    fn parse_and_lookup() {
        let headers: Headers = BLOCK.parse().unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("a"), Some("1"));
        assert_eq!(headers.get("b"), Some("22"));
        assert_eq!(headers.get("c"), None);
    }

    #[test]
    fn parse_stops_at_empty_line_and_keeps_first_duplicate() {
        let headers = Headers::parse("a:1\na:2\n\nnot:a header").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("a"), Some("1"));
        assert_eq!(headers.get("not"), None);
    }

    #[test]
    fn parse_rejects_line_without_colon() {
        assert!(matches!(
            Headers::parse("a:1\nbogus\n\n"),
            Err(FrameError::InvalidHeader(_))
        ));
    }

    #[test]
    fn build_renders_wire_block() {
        let headers = Headers::new()
            .with("a", "1")
            .unwrap()
            .with("b", "22")
            .unwrap();
        assert_eq!(headers.to_block(), BLOCK);
        assert_eq!(headers.to_string(), BLOCK);
        assert_eq!(Headers::parse(&headers.to_block()).unwrap(), headers);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut headers = Headers::parse(BLOCK).unwrap();
        headers.insert("a", "one").unwrap();
        let order: Vec<_> = headers.iter().collect();
        assert_eq!(order, vec![("a", "one"), ("b", "22")]);

        assert_eq!(headers.remove("a"), Some("one".to_string()));
        assert_eq!(headers.to_block(), "b:22\n\n");
    }

    #[test]
    fn insert_rejects_unrepresentable_entries() {
        let mut headers = Headers::new();
        assert!(headers.insert("", "v").is_err());
        assert!(headers.insert("a:b", "v").is_err());
        assert!(headers.insert("a\nb", "v").is_err());
        assert!(headers.insert("a", "multi\nline").is_err());
        assert!(headers.is_empty());
    }
}
