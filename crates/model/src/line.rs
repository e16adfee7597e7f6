use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::pattern::Pattern;

static TEAM_OR_USER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@[A-Za-z0-9](?:[A-Za-z0-9_.\-]*)(?:/[A-Za-z0-9_.\-]+)?$").expect("owner regex")
});

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

/// Whether `token` is an owner reference: `@user`, `@org/team` or an e-mail.
pub fn is_owner(token: &str) -> bool {
    TEAM_OR_USER.is_match(token) || EMAIL.is_match(token)
}

/// Identity of a line that stays stable while the file is edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub(crate) u32);

/// Owners of a rule, in declaration order and without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OwnerSet(Vec<String>);

impl OwnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from whitespace separated tokens, dropping duplicates.
    pub fn from_tokens(input: &str) -> Self {
        let mut set = Self::new();
        for token in input.split_whitespace() {
            set.insert(token);
        }
        set
    }

    /// Appends `owner` unless already present.
    pub fn insert(&mut self, owner: impl Into<String>) -> bool {
        let owner = owner.into();
        if self.contains(&owner) {
            return false;
        }
        self.0.push(owner);
        true
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.0.iter().any(|o| o == owner)
    }

    /// Replaces `from` with `to` in place. When `to` is already present the
    /// `from` entry is dropped instead so the set stays duplicate free.
    pub fn replace(&mut self, from: &str, to: &str) -> bool {
        let Some(pos) = self.0.iter().position(|o| o == from) else {
            return false;
        };
        if from == to {
            return false;
        }
        if self.contains(to) {
            self.0.remove(pos);
        } else {
            self.0[pos] = to.to_string();
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn join(&self) -> String {
        self.0.join(" ")
    }
}

impl<S: Into<String>> FromIterator<S> for OwnerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for owner in iter {
            set.insert(owner);
        }
        set
    }
}

/// A `<pattern> <owner>...` entry of the ownership file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatternRule {
    #[serde(skip)]
    id: LineId,
    line_number: usize,
    #[serde(serialize_with = "serialize_pattern")]
    pattern: Pattern,
    owners: OwnerSet,
    #[serde(skip)]
    raw: Option<String>,
    /// Line ends in `\r\n`; kept when the rule is re-rendered.
    #[serde(skip)]
    crlf: bool,
}

impl PatternRule {
    pub(crate) fn new(id: LineId, line_number: usize, pattern: &str, owners: OwnerSet) -> Self {
        Self {
            id,
            line_number,
            pattern: Pattern::new(pattern),
            owners,
            raw: None,
            crlf: false,
        }
    }

    pub(crate) fn with_crlf(mut self, crlf: bool) -> Self {
        self.crlf = crlf;
        self
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn owners(&self) -> &OwnerSet {
        &self.owners
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }

    /// Canonical `pattern owner1 owner2` rendering.
    pub fn to_line(&self) -> String {
        format!("{} {}", self.pattern, self.owners.join())
    }

    pub(crate) fn is_modified(&self) -> bool {
        self.raw.is_none()
    }

    pub(crate) fn set_pattern(&mut self, pattern: &str) {
        self.pattern = Pattern::new(pattern);
        self.raw = None;
    }

    pub(crate) fn replace_owner(&mut self, from: &str, to: &str) -> bool {
        let changed = self.owners.replace(from, to);
        if changed {
            self.raw = None;
        }
        changed
    }

    pub(crate) fn render(&self) -> Cow<'_, str> {
        match &self.raw {
            Some(raw) => Cow::Borrowed(raw),
            None if self.crlf => Cow::Owned(format!("{}\r", self.to_line())),
            None => Cow::Owned(self.to_line()),
        }
    }
}

fn serialize_pattern<S: Serializer>(pattern: &Pattern, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(pattern.as_str())
}

/// A line that is neither blank, a comment nor a pattern rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnrecognizedLine {
    #[serde(skip)]
    id: LineId,
    line_number: usize,
    raw: String,
}

impl UnrecognizedLine {
    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// One line of the ownership file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnershipLine {
    Blank(String),
    Comment(String),
    Rule(PatternRule),
    Unrecognized(UnrecognizedLine),
}

impl OwnershipLine {
    /// Classifies `raw`. Never fails: anything that is not blank, a comment or
    /// a well formed rule is kept as [`OwnershipLine::Unrecognized`].
    pub fn parse(raw: &str, id: LineId, line_number: usize) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Blank(raw.to_string());
        }
        if trimmed.starts_with('#') {
            return Self::Comment(raw.to_string());
        }

        let mut tokens = split_unescaped(trimmed).into_iter();
        let pattern = tokens.next().unwrap_or_default();
        let owners: Vec<&str> = tokens.collect();
        let well_formed = !is_owner(pattern)
            && !pattern.starts_with('@')
            && !owners.is_empty()
            && owners.iter().all(|token| is_owner(token));

        if well_formed {
            let mut rule = PatternRule::new(id, line_number, pattern, owners.into_iter().collect())
                .with_crlf(raw.ends_with('\r'));
            rule.raw = Some(raw.to_string());
            Self::Rule(rule)
        } else {
            Self::Unrecognized(UnrecognizedLine {
                id,
                line_number,
                raw: raw.to_string(),
            })
        }
    }

    pub fn as_rule(&self) -> Option<&PatternRule> {
        match self {
            Self::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub(crate) fn as_rule_mut(&mut self) -> Option<&mut PatternRule> {
        match self {
            Self::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<LineId> {
        match self {
            Self::Rule(rule) => Some(rule.id),
            Self::Unrecognized(line) => Some(line.id),
            Self::Blank(_) | Self::Comment(_) => None,
        }
    }

    /// Text written back to the file for this line.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Self::Blank(raw) | Self::Comment(raw) => Cow::Borrowed(raw),
            Self::Rule(rule) => rule.render(),
            Self::Unrecognized(line) => Cow::Borrowed(&line.raw),
        }
    }

    pub(crate) fn set_line_number(&mut self, line_number: usize) {
        match self {
            Self::Rule(rule) => rule.line_number = line_number,
            Self::Unrecognized(line) => line.line_number = line_number,
            Self::Blank(_) | Self::Comment(_) => {}
        }
    }
}

/// Splits on whitespace not preceded by a backslash. Escapes stay in the
/// tokens.
fn split_unescaped(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
            start.get_or_insert(idx);
        } else if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                tokens.push(&line[begin..idx]);
            }
        } else {
            start.get_or_insert(idx);
        }
    }
    if let Some(begin) = start {
        tokens.push(&line[begin..]);
    }
    tokens
}
