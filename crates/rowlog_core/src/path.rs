//! Paths into a record.

use crate::error::{CoreError, CoreResult};
use rowlog_codec::Value;
use std::fmt;

/// One step of a [`Path`]: a map key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathToken {
    /// Key in a map.
    Key(String),
    /// Position in a list.
    Index(usize),
}

impl PathToken {
    /// Persisted form: text for keys, integer for indexes.
    pub fn to_value(&self) -> Value {
        match self {
            PathToken::Key(k) => Value::Text(k.clone()),
            #[allow(clippy::cast_possible_wrap)]
            PathToken::Index(i) => Value::Integer(*i as i64),
        }
    }

    /// Parses the persisted form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(k) => Some(PathToken::Key(k.clone())),
            Value::Integer(i) => usize::try_from(*i).ok().map(PathToken::Index),
            _ => None,
        }
    }
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathToken::Key(k) if k == "$" => f.write_str("\\$"),
            PathToken::Key(k) => {
                for c in k.chars() {
                    if matches!(c, '\\' | '.' | '[' | ']') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            PathToken::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// A location inside a record, from the root down.
///
/// The empty path addresses the whole record. Paths display and parse in a
/// dotted form: `address.lines[0]`. A backslash escapes `.`, `[`, `]` and
/// `\\` inside keys, and a key that is exactly `$` displays as `\\$`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<PathToken>);

impl Path {
    /// The path of the whole record.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a path from tokens.
    #[must_use]
    pub fn new(tokens: Vec<PathToken>) -> Self {
        Self(tokens)
    }

    /// Appends a key step.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathToken::Key(key.into()));
        self
    }

    /// Appends an index step.
    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathToken::Index(index));
        self
    }

    /// Returns the tokens of this path.
    pub fn tokens(&self) -> &[PathToken] {
        &self.0
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `prefix` addresses this location or one of its ancestors.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Splits into the parent tokens and the last token.
    pub fn split_last(&self) -> Option<(&PathToken, &[PathToken])> {
        self.0.split_last()
    }

    pub(crate) fn push(&mut self, token: PathToken) {
        self.0.push(token);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }

    /// Persisted form: an array of tokens.
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(PathToken::to_value).collect())
    }

    /// Parses the persisted form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPath`] if the value is not an array of
    /// text or non-negative integer tokens.
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| CoreError::invalid_path(format!("expected array, got {}", value.kind())))?;
        items
            .iter()
            .map(|item| {
                PathToken::from_value(item).ok_or_else(|| {
                    CoreError::invalid_path(format!("bad path token of kind {}", item.kind()))
                })
            })
            .collect::<CoreResult<Vec<_>>>()
            .map(Self)
    }

    /// Parses the dotted form, e.g. `profile.emails[1]`.
    ///
    /// `""` and `"$"` are the root path. Empty keys have no dotted form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPath`] on empty keys, malformed indexes
    /// or a trailing backslash.
    pub fn parse(input: &str) -> CoreResult<Self> {
        if input.is_empty() || input == "$" {
            return Ok(Self::root());
        }
        let malformed = |what: &str| CoreError::invalid_path(format!("{what} in {input:?}"));

        let mut tokens = Vec::new();
        let mut chars = input.chars().peekable();
        loop {
            let mut key = None::<String>;
            while let Some(&c) = chars.peek() {
                let c = match c {
                    '.' | '[' => break,
                    ']' => return Err(malformed("unmatched `]`")),
                    '\\' => {
                        chars.next();
                        chars.next().ok_or_else(|| malformed("trailing backslash"))?
                    }
                    c => {
                        chars.next();
                        c
                    }
                };
                key.get_or_insert_with(String::new).push(c);
            }
            let had_key = key.is_some();
            tokens.extend(key.map(PathToken::Key));

            let mut indexes = 0;
            while chars.next_if_eq(&'[').is_some() {
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) => digits.push(c),
                        None => return Err(malformed("malformed index")),
                    }
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| malformed("malformed index"))?;
                tokens.push(PathToken::Index(index));
                indexes += 1;
            }
            if !had_key && indexes == 0 {
                return Err(malformed("empty key"));
            }

            match chars.next() {
                None => return Ok(Self(tokens)),
                Some('.') => {}
                Some(_) => return Err(malformed("malformed index")),
            }
        }
    }

    /// Returns the value at this path, if present.
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(root, |current, token| step(current, token))
    }

    /// Mutable variant of [`Path::lookup`].
    pub fn lookup_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        self.0
            .iter()
            .try_fold(root, |current, token| step_mut(current, token))
    }

    /// Removes and returns the value at this path. The root cannot be
    /// removed.
    pub fn remove_from(&self, root: &mut Value) -> Option<Value> {
        let (last, parent) = self.split_last()?;
        let parent = Path(parent.to_vec()).lookup_mut(root)?;
        match (last, parent) {
            (PathToken::Key(k), parent) => parent.remove(k),
            (PathToken::Index(i), Value::Array(items)) if *i < items.len() => {
                Some(items.remove(*i))
            }
            _ => None,
        }
    }
}

pub(crate) fn step<'v>(value: &'v Value, token: &PathToken) -> Option<&'v Value> {
    match (value, token) {
        (Value::Map(_), PathToken::Key(k)) => value.get(k),
        (Value::Array(items), PathToken::Index(i)) => items.get(*i),
        _ => None,
    }
}

pub(crate) fn step_mut<'v>(value: &'v mut Value, token: &PathToken) -> Option<&'v mut Value> {
    match token {
        PathToken::Key(k) => value.get_mut(k),
        PathToken::Index(i) => match value {
            Value::Array(items) => items.get_mut(*i),
            _ => None,
        },
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 && matches!(token, PathToken::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl From<&str> for Path {
    /// Single-key path. Use [`Path::parse`] for the dotted form.
    fn from(key: &str) -> Self {
        Self(vec![PathToken::Key(key.to_string())])
    }
}
