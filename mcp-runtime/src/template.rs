//! URI templates for resources.
//!
//! Grammar: `scheme://segment/segment...`, where a segment is either literal
//! text or exactly one placeholder. `{name}` binds one non-empty segment,
//! `{name*}` binds one or more trailing segments. An optional trailing
//! `{?a,b}` binds query parameters when the request carries them. The
//! authority counts as the first segment, so `greeting://{name}` is valid.

use std::collections::HashSet;
use std::fmt;

use beacon_core::ConfigurationError;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ParamValue {
    /// The value of a scalar placeholder.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(value) => Some(value),
            ParamValue::Multiple(_) => None,
        }
    }

    /// Every bound value; a scalar yields a one-element slice.
    pub fn values(&self) -> &[String] {
        match self {
            ParamValue::Single(value) => std::slice::from_ref(value),
            ParamValue::Multiple(values) => values,
        }
    }
}

/// Parameters extracted from a matched URI, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceParams {
    values: IndexMap<String, ParamValue>,
}

impl ResourceParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    scheme: String,
    segments: Vec<Segment>,
    query: Vec<String>,
}

impl UriTemplate {
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let (base, query) = match raw.rfind("{?") {
            Some(start) => {
                let expr = &raw[start..];
                if !expr.ends_with('}') {
                    return Err(invalid("query expression must close the template"));
                }
                let names = expr[2..expr.len() - 1]
                    .split(',')
                    .map(str::trim)
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                (&raw[..start], names)
            }
            None => (raw, Vec::new()),
        };

        let (scheme, rest) = base
            .split_once("://")
            .ok_or_else(|| invalid("missing 'scheme://'"))?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(invalid("scheme must be non-empty alphanumeric"));
        }
        if rest.is_empty() {
            return Err(invalid("nothing after 'scheme://'"));
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        let raw_segments: Vec<&str> = rest.split('/').collect();
        for (index, part) in raw_segments.iter().enumerate() {
            if !part.contains(['{', '}']) {
                segments.push(Segment::Literal(part.to_string()));
                continue;
            }
            let inner = part
                .strip_prefix('{')
                .and_then(|p| p.strip_suffix('}'))
                .filter(|inner| !inner.contains(['{', '}']))
                .ok_or_else(|| invalid("a placeholder must fill its whole segment"))?;
            let (name, multi) = match inner.strip_suffix('*') {
                Some(name) => (name, true),
                None => (inner, false),
            };
            if multi && index + 1 != raw_segments.len() {
                return Err(invalid("multi-value placeholder must be the last segment"));
            }
            check_name(name, &mut seen).map_err(invalid)?;
            segments.push(if multi {
                Segment::Rest(name.to_string())
            } else {
                Segment::Param(name.to_string())
            });
        }
        for name in &query {
            check_name(name, &mut seen).map_err(invalid)?;
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: scheme.to_string(),
            segments,
            query,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the template names exactly one URI.
    pub fn is_static(&self) -> bool {
        self.query.is_empty()
            && self
                .segments
                .iter()
                .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param(name) | Segment::Rest(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .chain(self.query.iter().map(String::as_str))
            .collect()
    }

    /// Structural match; `None` when `uri` does not fit the template.
    pub fn matches(&self, uri: &str) -> Option<ResourceParams> {
        let uri = uri.split_once('#').map_or(uri, |(before, _)| before);
        let (base, query) = match uri.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (uri, None),
        };
        let (scheme, rest) = base.split_once("://")?;
        if scheme != self.scheme {
            return None;
        }
        if query.is_some() && self.query.is_empty() {
            return None;
        }

        let parts: Vec<&str> = rest.split('/').collect();
        let mut params = ResourceParams::default();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if parts.get(index) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let part = parts.get(index).filter(|part| !part.is_empty())?;
                    params.insert(name, ParamValue::Single(part.to_string()));
                }
                Segment::Rest(name) => {
                    let tail = parts.get(index..)?;
                    if tail.is_empty() || tail.iter().any(|part| part.is_empty()) {
                        return None;
                    }
                    let values = tail.iter().map(|part| part.to_string()).collect();
                    params.insert(name, ParamValue::Multiple(values));
                }
            }
        }
        let consumes_tail = matches!(self.segments.last(), Some(Segment::Rest(_)));
        if !consumes_tail && parts.len() != self.segments.len() {
            return None;
        }

        if let Some(query) = query {
            let mut found: IndexMap<String, Vec<String>> = IndexMap::new();
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                if self.query.iter().any(|name| name.as_str() == key.as_ref()) {
                    found
                        .entry(key.into_owned())
                        .or_default()
                        .push(value.into_owned());
                }
            }
            for name in &self.query {
                if let Some(mut values) = found.shift_remove(name) {
                    let value = if values.len() == 1 {
                        ParamValue::Single(values.remove(0))
                    } else {
                        ParamValue::Multiple(values)
                    };
                    params.insert(name, value);
                }
            }
        }

        Some(params)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn check_name(name: &str, seen: &mut HashSet<String>) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("placeholder name is empty");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("placeholder names are limited to letters, digits and '_'");
    }
    if !seen.insert(name.to_string()) {
        return Err("placeholder name is used twice");
    }
    Ok(())
}
