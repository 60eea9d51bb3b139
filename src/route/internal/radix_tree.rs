use std::sync::Arc;

use arc_swap::ArcSwap;
use percent_encoding::percent_decode;
use smallvec::SmallVec;

use super::pattern::{parse_pattern, ParamRegex, Segment};
use crate::error::RouteError;

fn longest_common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(a, b)| **a == **b).count()
}

fn find_slash(path: &[u8]) -> usize {
    path.iter().position(|c| *c == b'/').unwrap_or(path.len())
}

/// Path parameters captured by the router.
///
/// Values are stored percent-decoded, in the order they appear in the path.
/// When nested routers capture the same name, [`PathParams::get`] returns
/// the innermost capture.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct PathParams(SmallVec<[(String, String); 4]>);

impl PathParams {
    /// Returns the value of the parameter named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }

    /// An iterator over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of captured parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing was captured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub(crate) fn extend(&mut self, other: PathParams) {
        self.0.extend(other.0);
    }
}

/// A registered route.
///
/// Parameter names live here instead of on the shared param nodes, so two
/// patterns walking the same nodes can name their captures differently.
#[derive(Debug)]
pub(crate) struct Route<T> {
    pub(crate) data: T,
    pub(crate) pattern: Arc<str>,
    param_names: Vec<String>,
}

impl<T> Route<T> {
    fn new(data: T, pattern: &str, segments: &[Segment<'_>]) -> Self {
        Self {
            data,
            pattern: pattern.into(),
            param_names: segments
                .iter()
                .filter_map(Segment::param_name)
                .map(ToString::to_string)
                .collect(),
        }
    }
}

struct Node<T> {
    path: Vec<u8>,
    regex: Option<ParamRegex>,
    tsr: bool,
    route: Option<ArcSwap<Route<T>>>,
    indices: Vec<u8>,
    children: Vec<Node<T>>,
    param_child: Option<Box<Node<T>>>,
    wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn new(path: Vec<u8>, regex: Option<ParamRegex>) -> Self {
        Self {
            path,
            regex,
            tsr: false,
            route: None,
            indices: Vec::new(),
            children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    fn find_static_child(&self, prefix: u8) -> Option<usize> {
        self.indices.iter().position(|c| *c == prefix)
    }

    fn has_route(&self) -> bool {
        self.route.is_some()
    }

    /// Moves everything after the first `n` bytes of this static node into a
    /// new child.
    fn split(&mut self, n: usize) {
        let tail = Node {
            path: self.path.split_off(n),
            regex: None,
            tsr: std::mem::take(&mut self.tsr),
            route: self.route.take(),
            indices: std::mem::take(&mut self.indices),
            children: std::mem::take(&mut self.children),
            param_child: self.param_child.take(),
            wildcard_child: self.wildcard_child.take(),
        };
        self.indices = vec![tail.path[0]];
        self.children = vec![tail];
    }

    /// Walks down the segments, creating missing nodes, and returns the node
    /// the last segment ends at.
    fn descend(
        &mut self,
        segments: &[Segment<'_>],
        pattern: &str,
    ) -> Result<&mut Node<T>, RouteError> {
        let (segment, rest) = match segments.split_first() {
            Some(first) => first,
            None => return Ok(self),
        };

        match segment {
            Segment::Static(prefix) => self.descend_static(prefix, rest, pattern),
            Segment::Param { regex, .. } => {
                if let Some(existing) = &self.param_child {
                    if existing.regex != *regex {
                        return Err(existing.ambiguous(pattern));
                    }
                }
                let child = self.param_child.get_or_insert_with(|| {
                    Box::new(Node::new(Vec::new(), regex.clone()))
                });
                child.descend(rest, pattern)
            }
            Segment::Wildcard { .. } => {
                if !rest.is_empty() {
                    return Err(RouteError::WildcardNotLast(pattern.to_string()));
                }
                let child = self
                    .wildcard_child
                    .get_or_insert_with(|| Box::new(Node::new(Vec::new(), None)));
                Ok(&mut **child)
            }
        }
    }

    fn descend_static(
        &mut self,
        prefix: &[u8],
        rest: &[Segment<'_>],
        pattern: &str,
    ) -> Result<&mut Node<T>, RouteError> {
        match self.find_static_child(prefix[0]) {
            Some(pos) => {
                let child = &mut self.children[pos];
                let n = longest_common_prefix(&child.path, prefix);
                if n < child.path.len() {
                    child.split(n);
                }
                if n < prefix.len() {
                    child.descend_static(&prefix[n..], rest, pattern)
                } else {
                    child.descend(rest, pattern)
                }
            }
            None => {
                self.indices.push(prefix[0]);
                self.children.push(Node::new(prefix.to_vec(), None));
                let pos = self.children.len() - 1;
                self.children[pos].descend(rest, pattern)
            }
        }
    }

    fn ambiguous(&self, pattern: &str) -> RouteError {
        RouteError::AmbiguousParam {
            path: pattern.to_string(),
            existing: match &self.regex {
                Some(regex) => format!("{{:{}}}", regex.source()),
                None => "{}".to_string(),
            },
        }
    }

    /// Reports the error `descend` followed by a route insertion would
    /// hit, without touching the tree.
    fn check(&self, segments: &[Segment<'_>], pattern: &str, mutable: bool) -> Result<(), RouteError> {
        match segments.split_first() {
            None if self.has_route() && !mutable => Err(RouteError::Duplicate(pattern.to_string())),
            None => Ok(()),
            Some((Segment::Static(prefix), rest)) => self.check_static(prefix, rest, pattern, mutable),
            Some((Segment::Param { regex, .. }, rest)) => match &self.param_child {
                Some(existing) if existing.regex != *regex => Err(existing.ambiguous(pattern)),
                Some(existing) => existing.check(rest, pattern, mutable),
                None => check_new(rest, pattern),
            },
            Some((Segment::Wildcard { .. }, rest)) => {
                if !rest.is_empty() {
                    return Err(RouteError::WildcardNotLast(pattern.to_string()));
                }
                match &self.wildcard_child {
                    Some(child) => child.check(rest, pattern, mutable),
                    None => Ok(()),
                }
            }
        }
    }

    fn check_static(
        &self,
        prefix: &[u8],
        rest: &[Segment<'_>],
        pattern: &str,
        mutable: bool,
    ) -> Result<(), RouteError> {
        let child = match self.find_static_child(prefix[0]) {
            Some(pos) => &self.children[pos],
            None => return check_new(rest, pattern),
        };
        let n = longest_common_prefix(&child.path, prefix);
        if n < child.path.len() {
            check_new(rest, pattern)
        } else if n < prefix.len() {
            child.check_static(&prefix[n..], rest, pattern, mutable)
        } else {
            child.check(rest, pattern, mutable)
        }
    }

    /// Structural lookup of a registered pattern, no matching involved.
    fn locate(&self, segments: &[Segment<'_>]) -> Option<&Node<T>> {
        match segments.split_first() {
            None => Some(self),
            Some((Segment::Static(prefix), rest)) => self.locate_static(prefix, rest),
            Some((Segment::Param { regex, .. }, rest)) => {
                let child = self.param_child.as_ref()?;
                if child.regex != *regex {
                    return None;
                }
                child.locate(rest)
            }
            Some((Segment::Wildcard { .. }, rest)) if rest.is_empty() => {
                self.wildcard_child.as_deref()
            }
            Some((Segment::Wildcard { .. }, _)) => None,
        }
    }

    fn locate_static(&self, prefix: &[u8], rest: &[Segment<'_>]) -> Option<&Node<T>> {
        let child = &self.children[self.find_static_child(prefix[0])?];
        let tail = prefix.strip_prefix(child.path.as_slice())?;
        if tail.is_empty() {
            child.locate(rest)
        } else {
            child.locate_static(tail, rest)
        }
    }

    fn find<'a, 'p>(
        &'a self,
        path: &'p [u8],
        values: &mut SmallVec<[&'p [u8]; 8]>,
        tsr: &mut bool,
    ) -> Option<&'a ArcSwap<Route<T>>> {
        if path.is_empty() {
            if let Some(route) = &self.route {
                return Some(route);
            }
            if let Some(route) = self.wildcard_child.as_ref().and_then(|w| w.route.as_ref()) {
                values.push(path);
                return Some(route);
            }
            if self.tsr {
                *tsr = true;
            }
            return None;
        }

        let num_values = values.len();

        if let Some(pos) = self.find_static_child(path[0]) {
            let child = &self.children[pos];
            if let Some(tail) = path.strip_prefix(child.path.as_slice()) {
                if let Some(route) = child.find(tail, values, tsr) {
                    return Some(route);
                }
                values.truncate(num_values);
            }
        }

        if let Some(child) = &self.param_child {
            let end = find_slash(path);
            let value = &path[..end];
            let accepted = !value.is_empty()
                && child
                    .regex
                    .as_ref()
                    .map_or(true, |regex| regex.is_match(value));
            if accepted {
                values.push(value);
                if let Some(route) = child.find(&path[end..], values, tsr) {
                    return Some(route);
                }
                values.truncate(num_values);
            }
        }

        if let Some(route) = self.wildcard_child.as_ref().and_then(|w| w.route.as_ref()) {
            values.push(path);
            return Some(route);
        }

        None
    }

    /// Case-insensitive walk, writing the path as registered into `out`.
    ///
    /// Returns `Some(true)` when only a trailing slash marker was found, which
    /// is accepted only when `accept_tsr` is set.
    fn find_case_insensitive(&self, path: &[u8], out: &mut Vec<u8>, accept_tsr: bool) -> Option<bool> {
        if path.is_empty() {
            if self.has_route()
                || self.wildcard_child.as_ref().map_or(false, |w| w.has_route())
            {
                return Some(false);
            }
            return (accept_tsr && self.tsr).then(|| true);
        }

        let len = out.len();

        for child in &self.children {
            let n = child.path.len();
            if n <= path.len() && path[..n].eq_ignore_ascii_case(&child.path) {
                out.extend_from_slice(&child.path);
                if let Some(tsr) = child.find_case_insensitive(&path[n..], out, accept_tsr) {
                    return Some(tsr);
                }
                out.truncate(len);
            }
        }

        if let Some(child) = &self.param_child {
            let end = find_slash(path);
            let value = &path[..end];
            let accepted = !value.is_empty()
                && child
                    .regex
                    .as_ref()
                    .map_or(true, |regex| regex.is_match(value));
            if accepted {
                out.extend_from_slice(value);
                if let Some(tsr) = child.find_case_insensitive(&path[end..], out, accept_tsr) {
                    return Some(tsr);
                }
                out.truncate(len);
            }
        }

        if self.wildcard_child.as_ref().map_or(false, |w| w.has_route()) {
            out.extend_from_slice(path);
            return Some(false);
        }

        None
    }
}

#[derive(Debug)]
pub(crate) struct Matched<T> {
    pub(crate) route: Arc<Route<T>>,
    pub(crate) params: PathParams,
}

#[derive(Debug)]
pub(crate) enum Lookup<T> {
    Matched(Matched<T>),
    /// No route, but the path with its trailing slash added or removed has one.
    TrailingSlash,
    NotFound,
}

pub(crate) struct RadixTree<T> {
    root: Node<T>,
    mutable: bool,
}

impl<T> RadixTree<T> {
    pub(crate) fn new(mutable: bool) -> Self {
        Self {
            root: Node::new(Vec::new(), None),
            mutable,
        }
    }

    /// Fails with the error [`RadixTree::add`] would return for this
    /// pattern, leaving the tree untouched.
    pub(crate) fn check(&self, pattern: &str) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;
        self.root.check(&segments, pattern, self.mutable)
    }

    pub(crate) fn add(&mut self, pattern: &str, data: T) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;
        let route = Route::new(data, pattern, &segments);
        let mutable = self.mutable;
        let node = self.root.descend(&segments, pattern)?;

        match &node.route {
            Some(_) if !mutable => return Err(RouteError::Duplicate(pattern.to_string())),
            Some(slot) => slot.store(Arc::new(route)),
            None => {
                node.route = Some(ArcSwap::from_pointee(route));
                node.tsr = false;
            }
        }

        if let Some(variant) = trailing_slash_variant(pattern, &segments) {
            let segments = parse_pattern(&variant)?;
            let node = self.root.descend(&segments, &variant)?;
            if !node.has_route() {
                node.tsr = true;
            }
        }

        Ok(())
    }

    /// Swaps the data of an existing route.
    ///
    /// Returns `Ok(false)` if the pattern was never registered.
    pub(crate) fn replace(&self, pattern: &str, data: T) -> Result<bool, RouteError> {
        if !self.mutable {
            return Err(RouteError::NotMutable);
        }
        let segments = parse_pattern(pattern)?;
        match self.root.locate(&segments).and_then(|node| node.route.as_ref()) {
            Some(slot) => {
                slot.store(Arc::new(Route::new(data, pattern, &segments)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns the route registered with exactly this pattern.
    pub(crate) fn route(&self, pattern: &str) -> Option<Arc<Route<T>>> {
        let segments = parse_pattern(pattern).ok()?;
        self.root
            .locate(&segments)
            .and_then(|node| node.route.as_ref())
            .map(|slot| slot.load_full())
    }

    pub(crate) fn get(&self, path: &str) -> Lookup<T> {
        let mut values = SmallVec::new();
        let mut tsr = false;

        match self.root.find(path.as_bytes(), &mut values, &mut tsr) {
            Some(slot) => {
                let route = slot.load_full();
                let mut params = PathParams::default();
                for (name, value) in route.param_names.iter().zip(values) {
                    if !name.is_empty() {
                        params.push(
                            name.as_str(),
                            percent_decode(value).decode_utf8_lossy().into_owned(),
                        );
                    }
                }
                Lookup::Matched(Matched { route, params })
            }
            None if tsr => Lookup::TrailingSlash,
            None => Lookup::NotFound,
        }
    }

    /// Looks the path up ignoring ASCII case and returns it as registered.
    ///
    /// A path matching a route exactly wins over one that only matches after
    /// fixing the trailing slash, which is tried when `fix_trailing_slash`
    /// is set.
    pub(crate) fn find_case_insensitive_path(
        &self,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        let mut out = Vec::with_capacity(path.len() + 1);
        if self
            .root
            .find_case_insensitive(path.as_bytes(), &mut out, false)
            .is_some()
        {
            return String::from_utf8(out).ok();
        }

        if !fix_trailing_slash {
            return None;
        }

        out.clear();
        if self.root.find_case_insensitive(path.as_bytes(), &mut out, true)? {
            if out.last() == Some(&b'/') {
                out.pop();
            } else {
                out.push(b'/');
            }
        }
        String::from_utf8(out).ok()
    }
}

/// Below a node that does not exist yet only a misplaced wildcard can fail.
fn check_new(segments: &[Segment<'_>], pattern: &str) -> Result<(), RouteError> {
    match segments
        .iter()
        .position(|segment| matches!(segment, Segment::Wildcard { .. }))
    {
        Some(pos) if pos + 1 < segments.len() => {
            Err(RouteError::WildcardNotLast(pattern.to_string()))
        }
        _ => Ok(()),
    }
}

/// The pattern a trailing slash redirect should be recommended for.
fn trailing_slash_variant(pattern: &str, segments: &[Segment<'_>]) -> Option<String> {
    if pattern == "/" {
        return None;
    }

    if let Some(Segment::Wildcard { .. }) = segments.last() {
        let prefix = &pattern[..pattern.rfind('{')?];
        return prefix
            .strip_suffix('/')
            .filter(|prefix| !prefix.is_empty())
            .map(ToString::to_string);
    }

    match pattern.strip_suffix('/') {
        Some(prefix) => Some(prefix.to_string()),
        None => Some(format!("{}/", pattern)),
    }
}
