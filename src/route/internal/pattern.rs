use std::fmt::{self, Debug, Formatter};

use regex::bytes::Regex;

use crate::error::RouteError;

/// A compiled parameter constraint.
///
/// Two constraints are equal when their sources are equal, which is what
/// registration uses to decide whether a param node can be shared.
#[derive(Clone)]
pub(crate) struct ParamRegex {
    source: String,
    re: Regex,
}

impl ParamRegex {
    fn new(source: &str) -> Option<Self> {
        Some(Self {
            source: source.to_string(),
            re: Regex::new(&format!("^(?:{})$", source)).ok()?,
        })
    }

    #[inline]
    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub(crate) fn is_match(&self, value: &[u8]) -> bool {
        self.re.is_match(value)
    }
}

impl Debug for ParamRegex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParamRegex").field(&self.source).finish()
    }
}

impl PartialEq for ParamRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ParamRegex {}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Segment<'a> {
    Static(&'a [u8]),
    Param {
        name: &'a str,
        regex: Option<ParamRegex>,
    },
    Wildcard {
        name: &'a str,
    },
}

impl<'a> Segment<'a> {
    pub(crate) fn param_name(&self) -> Option<&'a str> {
        match self {
            Segment::Static(_) => None,
            Segment::Param { name, .. } | Segment::Wildcard { name } => Some(*name),
        }
    }
}

/// Finds the `}` closing the parameter opened at `open`.
///
/// Braces inside a constraint are balanced, so `{id:[0-9]{3}}` closes at the
/// last byte. Also returns the position of the optional marker, which is a
/// `?` seen before the constraint started.
fn find_param_end(pattern: &[u8], open: usize) -> Option<(usize, Option<usize>)> {
    let mut depth = 0usize;
    let mut has_regex = false;
    let mut marker = None;

    for (i, c) in pattern.iter().enumerate().skip(open + 1) {
        match c {
            b'{' => depth += 1,
            b'}' if depth > 0 => depth -= 1,
            b'}' => return Some((i, marker)),
            b':' => has_regex = true,
            b'?' if !has_regex && marker.is_none() => marker = Some(i),
            _ => {}
        }
    }

    None
}

/// Parses a concrete pattern (no optional markers) into segments.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    let invalid = || RouteError::InvalidPath(pattern.to_string());

    if !pattern.starts_with('/') {
        return Err(invalid());
    }

    let bytes = pattern.as_bytes();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            let start = i;
            while i < bytes.len() && bytes[i] != b'{' {
                i += 1;
            }
            segments.push(Segment::Static(&bytes[start..i]));
            continue;
        }

        let (close, marker) = find_param_end(bytes, i).ok_or_else(invalid)?;
        if marker.is_some() {
            return Err(invalid());
        }
        if close + 1 < bytes.len() && bytes[close + 1] != b'/' {
            return Err(invalid());
        }

        let inner = &pattern[i + 1..close];
        let (name, regex) = match inner.find(':') {
            Some(pos) => (&inner[..pos], Some(&inner[pos + 1..])),
            None => (inner, None),
        };

        match regex {
            Some("*") => {
                if close + 1 != bytes.len() {
                    return Err(RouteError::WildcardNotLast(pattern.to_string()));
                }
                segments.push(Segment::Wildcard { name });
            }
            Some(source) => {
                if name.is_empty() || source.is_empty() {
                    return Err(invalid());
                }
                let regex = ParamRegex::new(source).ok_or_else(|| RouteError::InvalidRegex {
                    path: pattern.to_string(),
                    regex: source.to_string(),
                })?;
                segments.push(Segment::Param {
                    name,
                    regex: Some(regex),
                });
            }
            None => {
                if name.is_empty() {
                    return Err(invalid());
                }
                segments.push(Segment::Param { name, regex: None });
            }
        }

        i = close + 1;
    }

    Ok(segments)
}

fn push_unique(patterns: &mut Vec<String>, pattern: String) {
    if !patterns.contains(&pattern) {
        patterns.push(pattern);
    }
}

/// Expands the optional parameters of `pattern` into concrete patterns.
///
/// Optionals are resolved left to right. For every optional parameter two
/// patterns are produced: the pattern cut just before the parameter, and the
/// pattern up to and including the parameter, now mandatory. Optionals are
/// not combined with each other, and text after the last optional parameter
/// is dropped, so `/a/{b?}/c` registers `/a` and `/a/{b}` only.
pub(crate) fn expand_optional(pattern: &str) -> Vec<String> {
    let mut working = pattern.to_string();
    let mut patterns = Vec::new();
    let mut i = 0;

    while let Some(open) = working[i..].find('{').map(|pos| pos + i) {
        let (close, marker) = match find_param_end(working.as_bytes(), open) {
            Some(found) => found,
            None => break,
        };

        let marker = match marker {
            Some(marker) => marker,
            None => {
                i = close + 1;
                continue;
            }
        };

        let before = &working[..open];
        let truncated = before.strip_suffix('/').unwrap_or(before);
        push_unique(
            &mut patterns,
            if truncated.is_empty() {
                "/".to_string()
            } else {
                truncated.to_string()
            },
        );

        working.remove(marker);
        let close = close - 1;
        push_unique(&mut patterns, working[..=close].to_string());
        i = close + 1;
    }

    if patterns.is_empty() {
        patterns.push(pattern.to_string());
    }
    patterns
}
