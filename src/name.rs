/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

//! Canonical configuration property names.
//!
//! A [`PropertyName`] is an ordered list of elements. Text elements are
//! dot-separated (`server.port`), indexed elements are bracketed
//! (`servers[0].host`, `map[Key]`). Text elements carry three spellings:
//! the original as written, the dashed canonical form used for equality,
//! and the uniform form with all dashes removed. `serverPort`,
//! `server_port` and `server-port` are the same name; `servers[0]` and
//! `servers[1]` are not.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use strum::Display;

use crate::error::BindError;

/// The spelling of a name element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NameForm {
    /// As originally written, including case and punctuation.
    Original,
    /// Lowercase with word boundaries folded to dashes. Canonical form.
    Dashed,
    /// Dashed form with the dashes removed.
    Uniform,
}

#[derive(Debug, Clone)]
enum Element {
    Text { original: String, dashed: String },
    NumericIndex(usize),
    StringIndex(String),
}

impl Element {
    fn text(original: &str) -> Self {
        Element::Text {
            original: original.to_string(),
            dashed: to_dashed_form(original),
        }
    }

    fn index(content: &str) -> Self {
        if !content.is_empty() && content.bytes().all(|b| b.is_ascii_digit()) {
            match content.parse::<usize>() {
                Ok(index) => Element::NumericIndex(index),
                Err(_) => Element::StringIndex(content.to_string()),
            }
        } else {
            Element::StringIndex(content.to_string())
        }
    }

    fn is_indexed(&self) -> bool {
        !matches!(self, Element::Text { .. })
    }

    fn in_form(&self, form: NameForm) -> String {
        match self {
            Element::Text { original, dashed } => match form {
                NameForm::Original => original.clone(),
                NameForm::Dashed => dashed.clone(),
                NameForm::Uniform => dashed.chars().filter(|ch| *ch != '-').collect(),
            },
            Element::NumericIndex(index) => index.to_string(),
            Element::StringIndex(content) => content.clone(),
        }
    }

    fn canonical(&self) -> &str {
        match self {
            Element::Text { dashed, .. } => dashed,
            Element::NumericIndex(_) => "",
            Element::StringIndex(content) => content,
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Element::Text { dashed: a, .. }, Element::Text { dashed: b, .. }) => a == b,
            (Element::NumericIndex(a), Element::NumericIndex(b)) => a == b,
            (Element::StringIndex(a), Element::StringIndex(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Element::Text { dashed, .. } => {
                0u8.hash(state);
                dashed.hash(state);
            }
            Element::NumericIndex(index) => {
                1u8.hash(state);
                index.hash(state);
            }
            Element::StringIndex(content) => {
                2u8.hash(state);
                content.hash(state);
            }
        }
    }
}

/// A parsed configuration property name.
///
/// Equality, ordering and hashing use the dashed form of text elements, so
/// all relaxed spellings of the same key compare equal. Indexed elements
/// compare structurally: numeric indexes numerically, string indexes
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyName {
    elements: Vec<Element>,
}

impl PropertyName {
    /// The empty name, ancestor of every other name.
    pub fn empty() -> Self {
        PropertyName {
            elements: Vec::new(),
        }
    }

    /// Parses a dotted name such as `server.hosts[0].name`.
    ///
    /// Text segments tolerate camelCase, snake_case and kebab-case and are
    /// normalized through the dashed form. Bracketed segments are opaque:
    /// their content is kept verbatim with no case folding.
    pub fn of(name: &str) -> Result<Self, BindError> {
        let mut elements = Vec::new();
        Self::parse_into(name, &mut elements)?;
        Ok(PropertyName { elements })
    }

    fn parse_into(name: &str, elements: &mut Vec<Element>) -> Result<(), BindError> {
        if name.is_empty() {
            return Ok(());
        }
        let mut segment = String::new();
        let mut chars = name.chars().peekable();
        let mut expect_separator = false;
        while let Some(ch) = chars.next() {
            if expect_separator {
                match ch {
                    '.' => {
                        expect_separator = false;
                        if chars.peek().is_none() {
                            return Err(BindError::invalid_name(name, "trailing dot"));
                        }
                        continue;
                    }
                    '[' => {}
                    _ => {
                        return Err(BindError::invalid_name(
                            name,
                            "character after ']' must be '.' or '['",
                        ));
                    }
                }
            }
            match ch {
                '[' => {
                    if !segment.is_empty() {
                        elements.push(Element::text(&segment));
                        segment.clear();
                    }
                    let mut content = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == ']' {
                            closed = true;
                            break;
                        }
                        content.push(inner);
                    }
                    if !closed {
                        return Err(BindError::invalid_name(name, "unterminated '['"));
                    }
                    if content.is_empty() {
                        return Err(BindError::invalid_name(name, "empty index"));
                    }
                    elements.push(Element::index(&content));
                    expect_separator = true;
                }
                '.' => {
                    if segment.is_empty() {
                        return Err(BindError::invalid_name(name, "empty element"));
                    }
                    elements.push(Element::text(&segment));
                    segment.clear();
                    if chars.peek().is_none() {
                        return Err(BindError::invalid_name(name, "trailing dot"));
                    }
                }
                ch if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' => {
                    segment.push(ch);
                }
                _ => {
                    return Err(BindError::invalid_name(
                        name,
                        format!("invalid character '{ch}'"),
                    ));
                }
            }
        }
        if !segment.is_empty() {
            elements.push(Element::text(&segment));
        }
        Ok(())
    }

    /// Number of elements in this name.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element `index` rendered in the requested form.
    pub fn element(&self, index: usize, form: NameForm) -> String {
        self.elements
            .get(index)
            .map(|element| element.in_form(form))
            .unwrap_or_default()
    }

    /// The final element rendered in the requested form, or an empty string
    /// for the empty name.
    pub fn last_element(&self, form: NameForm) -> String {
        self.elements
            .last()
            .map(|element| element.in_form(form))
            .unwrap_or_default()
    }

    /// Whether element `index` is a bracketed element.
    pub fn is_indexed(&self, index: usize) -> bool {
        self.elements
            .get(index)
            .is_some_and(Element::is_indexed)
    }

    /// Whether element `index` is a bracketed numeric element.
    pub fn is_numeric_index(&self, index: usize) -> bool {
        matches!(self.elements.get(index), Some(Element::NumericIndex(_)))
    }

    pub fn is_last_element_indexed(&self) -> bool {
        self.elements.last().is_some_and(Element::is_indexed)
    }

    /// Returns a new name with `suffix` elements appended. The suffix uses
    /// the same grammar as [`PropertyName::of`] and may start with an index
    /// (`"[0]"`).
    pub fn append(&self, suffix: &str) -> Result<Self, BindError> {
        let mut elements = self.elements.clone();
        Self::parse_into(suffix, &mut elements)?;
        Ok(PropertyName { elements })
    }

    /// Returns a new name with a numeric index element appended.
    pub fn append_index(&self, index: usize) -> Self {
        let mut elements = self.elements.clone();
        elements.push(Element::NumericIndex(index));
        PropertyName { elements }
    }

    /// The first `size` elements of this name.
    pub fn chop(&self, size: usize) -> Self {
        if size >= self.elements.len() {
            return self.clone();
        }
        PropertyName {
            elements: self.elements[..size].to_vec(),
        }
    }

    /// All but the last element.
    pub fn parent(&self) -> Self {
        if self.elements.is_empty() {
            return self.clone();
        }
        self.chop(self.elements.len() - 1)
    }

    /// Whether `candidate` is nested anywhere under this name. The empty
    /// name is an ancestor of every non-empty name.
    pub fn is_ancestor_of(&self, candidate: &PropertyName) -> bool {
        if self.elements.len() >= candidate.elements.len() {
            return false;
        }
        self.elements
            .iter()
            .zip(candidate.elements.iter())
            .all(|(a, b)| a == b)
    }

    /// Whether `candidate` is nested exactly one level under this name.
    pub fn is_parent_of(&self, candidate: &PropertyName) -> bool {
        candidate.elements.len() == self.elements.len() + 1 && self.is_ancestor_of(candidate)
    }
}

impl PartialOrd for PropertyName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyName {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.elements.iter().zip(other.elements.iter()) {
            let ordering = match (a, b) {
                (Element::NumericIndex(x), Element::NumericIndex(y)) => x.cmp(y),
                _ => a.canonical().cmp(b.canonical()),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        self.elements.len().cmp(&other.elements.len())
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for element in &self.elements {
            match element {
                Element::Text { dashed, .. } => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{dashed}")?;
                }
                Element::NumericIndex(index) => write!(f, "[{index}]")?,
                Element::StringIndex(content) => write!(f, "[{content}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

/// Folds a property or parameter name into its dashed form: underscores
/// become dashes, camelCase humps gain a dash, everything outside brackets
/// is lowercased. Bracketed content is kept verbatim.
pub fn to_dashed_form(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut in_index = false;
    for ch in name.chars() {
        if in_index {
            result.push(ch);
            if ch == ']' {
                in_index = false;
            }
            continue;
        }
        if ch == '[' {
            in_index = true;
            result.push(ch);
            continue;
        }
        let ch = if ch == '_' { '-' } else { ch };
        if ch.is_uppercase() && !result.is_empty() && !result.ends_with('-') {
            result.push('-');
        }
        result.extend(ch.to_lowercase());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_names() {
        let name = PropertyName::of("server.hosts[0].name").unwrap();
        assert_eq!(name.len(), 4);
        assert_eq!(name.element(0, NameForm::Dashed), "server");
        assert_eq!(name.element(2, NameForm::Dashed), "0");
        assert!(name.is_numeric_index(2));
        assert_eq!(name.to_string(), "server.hosts[0].name");
    }

    #[test]
    fn empty_name_has_no_elements() {
        let name = PropertyName::of("").unwrap();
        assert!(name.is_empty());
        assert_eq!(name, PropertyName::empty());
    }

    #[test]
    fn relaxed_spellings_compare_equal() {
        let dashed = PropertyName::of("my.log-startup-info").unwrap();
        let camel = PropertyName::of("my.logStartupInfo").unwrap();
        let snake = PropertyName::of("my.log_startup_info").unwrap();
        assert_eq!(dashed, camel);
        assert_eq!(dashed, snake);
        assert_eq!(camel.to_string(), "my.log-startup-info");
    }

    #[test]
    fn bracketed_segments_keep_case() {
        let name = PropertyName::of("map[MyKey]").unwrap();
        assert_eq!(name.element(1, NameForm::Original), "MyKey");
        assert_ne!(name, PropertyName::of("map[mykey]").unwrap());
    }

    #[test]
    fn numeric_indexes_compare_numerically() {
        let two = PropertyName::of("list[2]").unwrap();
        let ten = PropertyName::of("list[10]").unwrap();
        assert!(two < ten);
        assert_ne!(two, ten);
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(PropertyName::of("a..b").is_err());
        assert!(PropertyName::of("a.").is_err());
        assert!(PropertyName::of("a[0").is_err());
        assert!(PropertyName::of("a[]").is_err());
        assert!(PropertyName::of("a[0]b").is_err());
        assert!(PropertyName::of("a b").is_err());
    }

    #[test]
    fn ancestor_and_parent_checks() {
        let root = PropertyName::of("server").unwrap();
        let child = PropertyName::of("server.port").unwrap();
        let grandchild = PropertyName::of("server.ssl.enabled").unwrap();
        assert!(root.is_ancestor_of(&child));
        assert!(root.is_ancestor_of(&grandchild));
        assert!(root.is_parent_of(&child));
        assert!(!root.is_parent_of(&grandchild));
        assert!(!child.is_ancestor_of(&root));
        assert!(PropertyName::empty().is_ancestor_of(&root));
    }

    #[test]
    fn ancestor_check_ignores_spelling() {
        let root = PropertyName::of("my.http-client").unwrap();
        let child = PropertyName::of("my.httpClient.timeout").unwrap();
        assert!(root.is_ancestor_of(&child));
    }

    #[test]
    fn chop_and_append() {
        let name = PropertyName::of("a.b.c").unwrap();
        assert_eq!(name.chop(2), PropertyName::of("a.b").unwrap());
        assert_eq!(name.chop(9), name);
        assert_eq!(name.parent(), PropertyName::of("a.b").unwrap());
        assert_eq!(
            name.append("d[1]").unwrap(),
            PropertyName::of("a.b.c.d[1]").unwrap()
        );
        assert_eq!(
            name.append_index(3),
            PropertyName::of("a.b.c[3]").unwrap()
        );
    }

    #[test]
    fn last_element_forms() {
        let name = PropertyName::of("a.my-word[0]").unwrap();
        assert!(name.is_last_element_indexed());
        assert_eq!(name.last_element(NameForm::Uniform), "0");
        assert_eq!(name.chop(2).last_element(NameForm::Uniform), "myword");
    }

    #[test]
    fn dashed_form_folds_conventions() {
        assert_eq!(to_dashed_form("logStartupInfo"), "log-startup-info");
        assert_eq!(to_dashed_form("log_startup_info"), "log-startup-info");
        assert_eq!(to_dashed_form("log-startup-info"), "log-startup-info");
        assert_eq!(to_dashed_form("items[MyKey]"), "items[MyKey]");
        assert_eq!(to_dashed_form("Simple"), "simple");
    }
}
