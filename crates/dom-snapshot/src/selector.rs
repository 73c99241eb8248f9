//! CSS selector parsing and matching.
//!
//! Supports the forms anchors are built from: type, universal, `#id`,
//! `.class`, attribute conditions (`[a]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`),
//! `:nth-of-type(n)`, `:nth-child(n)`, `:first-of-type`, `:last-of-type`,
//! `:first-child`, `:last-child`, the `:text-digest(hex)` extension, and the
//! descendant and child combinators. Selector lists and sibling combinators
//! are rejected as unsupported.

use std::fmt;
use std::str::FromStr;

use crate::document::{Document, NodeId};
use crate::errors::SelectorError;
use crate::text::text_digest;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    Includes { key: String, value: String },
    DashMatch { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Contains { key: String, value: String },
}

impl AttrCondition {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            AttrCondition::Exists { .. } => true,
            AttrCondition::Eq { value, .. } => actual == value,
            AttrCondition::Includes { value, .. } => {
                !value.is_empty() && actual.split_whitespace().any(|token| token == value)
            }
            AttrCondition::DashMatch { value, .. } => {
                actual == value || actual.starts_with(&format!("{value}-"))
            }
            AttrCondition::StartsWith { value, .. } => {
                !value.is_empty() && actual.starts_with(value.as_str())
            }
            AttrCondition::EndsWith { value, .. } => {
                !value.is_empty() && actual.ends_with(value.as_str())
            }
            AttrCondition::Contains { value, .. } => {
                !value.is_empty() && actual.contains(value.as_str())
            }
        }
    }

    fn key(&self) -> &str {
        match self {
            AttrCondition::Exists { key }
            | AttrCondition::Eq { key, .. }
            | AttrCondition::Includes { key, .. }
            | AttrCondition::DashMatch { key, .. }
            | AttrCondition::StartsWith { key, .. }
            | AttrCondition::EndsWith { key, .. }
            | AttrCondition::Contains { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PseudoClass {
    NthOfType(usize),
    NthChild(usize),
    FirstOfType,
    LastOfType,
    FirstChild,
    LastChild,
    TextDigest(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudos: Vec<PseudoClass>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    // Relation to the part on the left.
    combinator: Option<Combinator>,
}

/// A parsed selector chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    parts: Vec<Part>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the element at `node` matches this selector.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(last) = self.parts.last() else {
            return false;
        };
        if !matches_compound(doc, node, &last.compound) {
            return false;
        }
        matches_left(doc, node, &self.parts[..self.parts.len() - 1], last.combinator)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// Right-to-left with backtracking over descendant combinators.
fn matches_left(
    doc: &Document,
    node: NodeId,
    remaining: &[Part],
    combinator: Option<Combinator>,
) -> bool {
    let Some((last, rest)) = remaining.split_last() else {
        return true;
    };
    match combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => match doc.parent_element(node) {
            Some(parent) => {
                matches_compound(doc, parent, &last.compound)
                    && matches_left(doc, parent, rest, last.combinator)
            }
            None => false,
        },
        Combinator::Descendant => doc.ancestors(node).any(|ancestor| {
            matches_compound(doc, ancestor, &last.compound)
                && matches_left(doc, ancestor, rest, last.combinator)
        }),
    }
}

fn matches_compound(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if !element.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if element.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound
        .classes
        .iter()
        .all(|class_name| element.has_class(class_name))
    {
        return false;
    }
    if !compound
        .attrs
        .iter()
        .all(|condition| condition.matches(element.attr(condition.key())))
    {
        return false;
    }
    compound
        .pseudos
        .iter()
        .all(|pseudo| matches_pseudo(doc, node, pseudo))
}

fn matches_pseudo(doc: &Document, node: NodeId, pseudo: &PseudoClass) -> bool {
    match pseudo {
        PseudoClass::NthOfType(n) => doc.nth_of_type(node) == Some(*n),
        PseudoClass::NthChild(n) => doc.nth_child(node) == Some(*n),
        PseudoClass::FirstOfType => doc.nth_of_type(node) == Some(1),
        PseudoClass::LastOfType => {
            doc.nth_of_type(node).is_some()
                && doc.nth_of_type(node) == Some(doc.same_type_sibling_count(node))
        }
        PseudoClass::FirstChild => doc.nth_child(node) == Some(1),
        PseudoClass::LastChild => match doc.parent(node) {
            Some(parent) => doc.element_children(parent).last() == Some(&node),
            None => false,
        },
        PseudoClass::TextDigest(expected) => text_digest(&doc.text_content(node)) == *expected,
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        if self.source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut parts = Vec::new();
        self.skip_whitespace();
        parts.push(Part {
            compound: self.parse_compound()?,
            combinator: None,
        });

        loop {
            let saw_space = self.skip_whitespace();
            let Some(ch) = self.peek() else {
                break;
            };
            let combinator = match ch {
                '>' => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                ',' => return Err(self.unsupported("selector list")),
                '+' | '~' => return Err(self.unsupported("sibling combinator")),
                _ if saw_space => Combinator::Descendant,
                _ => return Err(self.syntax("unexpected character")),
            };
            parts.push(Part {
                compound: self.parse_compound()?,
                combinator: Some(combinator),
            });
        }

        Ok(Selector {
            source: self.source.trim().to_string(),
            parts,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut consumed = false;

        if self.peek() == Some('*') {
            self.pos += 1;
            consumed = true;
        } else if self.peek().map(is_ident_start).unwrap_or(false) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            consumed = true;
        }

        while let Some(ch) = self.peek() {
            match ch {
                '#' => {
                    self.pos += 1;
                    let id = self.parse_ident()?;
                    if compound.id.replace(id).is_some() {
                        return Err(self.syntax("duplicate id"));
                    }
                }
                '.' => {
                    self.pos += 1;
                    let class_name = self.parse_ident()?;
                    compound.classes.push(class_name);
                }
                '[' => {
                    let condition = self.parse_attr()?;
                    compound.attrs.push(condition);
                }
                ':' => {
                    let pseudo = self.parse_pseudo()?;
                    compound.pseudos.push(pseudo);
                }
                _ => break,
            }
            consumed = true;
        }

        if !consumed {
            return Err(self.syntax("expected a simple selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                out.push(self.parse_escape()?);
            } else if is_ident_char(ch) {
                out.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.syntax("expected identifier"));
        }
        Ok(out)
    }

    // Called with the cursor just past the backslash.
    fn parse_escape(&mut self) -> Result<char, SelectorError> {
        let Some(first) = self.peek() else {
            return Err(self.syntax("dangling escape"));
        };
        if !first.is_ascii_hexdigit() {
            self.pos += 1;
            return Ok(first);
        }
        let mut hex = String::new();
        while let Some(ch) = self.peek() {
            if hex.len() == 6 || !ch.is_ascii_hexdigit() {
                break;
            }
            hex.push(ch);
            self.pos += 1;
        }
        if matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.pos += 1;
        }
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.syntax("bad hex escape"))?;
        Ok(char::from_u32(code)
            .filter(|ch| *ch != '\0')
            .unwrap_or('\u{FFFD}'))
    }

    fn parse_attr(&mut self) -> Result<AttrCondition, SelectorError> {
        self.pos += 1;
        self.skip_whitespace();
        let key = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(AttrCondition::Exists { key });
        }

        let operator = match self.peek() {
            Some('=') => {
                self.pos += 1;
                '='
            }
            Some(op @ ('~' | '|' | '^' | '$' | '*')) => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(self.syntax("expected '=' in attribute operator"));
                }
                self.pos += 1;
                op
            }
            _ => return Err(self.syntax("expected attribute operator")),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_quoted(quote)?
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(self.syntax("expected ']'"));
        }
        self.pos += 1;

        Ok(match operator {
            '=' => AttrCondition::Eq { key, value },
            '~' => AttrCondition::Includes { key, value },
            '|' => AttrCondition::DashMatch { key, value },
            '^' => AttrCondition::StartsWith { key, value },
            '$' => AttrCondition::EndsWith { key, value },
            _ => AttrCondition::Contains { key, value },
        })
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.syntax("unterminated string")),
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    out.push(self.parse_escape()?);
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_pseudo(&mut self) -> Result<PseudoClass, SelectorError> {
        self.pos += 1;
        if self.peek() == Some(':') {
            return Err(self.unsupported("pseudo-element"));
        }
        let name = self.parse_ident()?.to_ascii_lowercase();
        let argument = if self.peek() == Some('(') {
            self.pos += 1;
            let start = self.pos;
            while let Some(ch) = self.peek() {
                if ch == ')' {
                    break;
                }
                self.pos += 1;
            }
            if self.peek() != Some(')') {
                return Err(self.syntax("unterminated pseudo-class argument"));
            }
            let argument: String = self.chars[start..self.pos].iter().collect();
            self.pos += 1;
            Some(argument.trim().to_string())
        } else {
            None
        };

        match (name.as_str(), argument) {
            ("nth-of-type", Some(arg)) => Ok(PseudoClass::NthOfType(self.parse_index(&arg)?)),
            ("nth-child", Some(arg)) => Ok(PseudoClass::NthChild(self.parse_index(&arg)?)),
            ("first-of-type", None) => Ok(PseudoClass::FirstOfType),
            ("last-of-type", None) => Ok(PseudoClass::LastOfType),
            ("first-child", None) => Ok(PseudoClass::FirstChild),
            ("last-child", None) => Ok(PseudoClass::LastChild),
            ("text-digest", Some(arg)) if !arg.is_empty() => {
                Ok(PseudoClass::TextDigest(arg.to_ascii_lowercase()))
            }
            _ => Err(self.unsupported(&format!(":{name}"))),
        }
    }

    fn parse_index(&self, arg: &str) -> Result<usize, SelectorError> {
        match arg.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(self.unsupported(&format!("index expression '{arg}'"))),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn syntax(&self, reason: &str) -> SelectorError {
        SelectorError::Syntax {
            selector: self.source.to_string(),
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn unsupported(&self, feature: &str) -> SelectorError {
        SelectorError::Unsupported {
            selector: self.source.to_string(),
            feature: feature.to_string(),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || ch == '\\' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}
