//! URL-to-page mappings.
//!
//! A [`Matcher`] is either a literal (exact path or url) or a compiled
//! pattern. [`PageMappings`] keeps `(matcher, page class)` pairs in
//! declaration order and resolves a location to the most specific class:
//! literal matches first, then pattern matches, ties broken by declaration
//! order.

use regex::Regex;
use std::fmt;
use std::rc::Rc;

use crate::page_object::PageClass;
use crate::result::{PageError, PageResult, REGEXP_MAPPING_MSG, URL_MISSING_MSG};

/// Location matcher
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact path or url
    Literal(String),
    /// Regular expression searched in the path or url
    Pattern(Regex),
}

impl Matcher {
    /// Literal matcher
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Compile `pattern` into a pattern matcher
    pub fn pattern(pattern: &str) -> PageResult<Self> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    /// Whether the location given as `path` and `url` matches
    #[must_use]
    pub fn matches(&self, path: &str, url: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == path || literal == url,
            Self::Pattern(regex) => regex.is_match(path) || regex.is_match(url),
        }
    }

    /// Rank used to order matches; lower is more specific
    #[must_use]
    pub const fn specificity(&self) -> u8 {
        match self {
            Self::Literal(_) => 0,
            Self::Pattern(_) => 1,
        }
    }

    /// Whether this is a literal
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Source text of the matcher
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(literal) => literal,
            Self::Pattern(regex) => regex.as_str(),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        self.is_literal() == other.is_literal() && self.as_str() == other.as_str()
    }
}

impl Eq for Matcher {}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal:?}"),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<Regex> for Matcher {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

/// Ordered `(matcher, page class)` table
#[derive(Debug, Clone, Default)]
pub struct PageMappings {
    entries: Vec<(Matcher, Rc<PageClass>)>,
}

impl PageMappings {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `matcher` to `class`; an equal matcher keeps its position and is repointed
    pub fn define(&mut self, matcher: impl Into<Matcher>, class: Rc<PageClass>) {
        let matcher = matcher.into();
        tracing::trace!(%matcher, page = class.name(), "page mapping defined");
        match self.entries.iter_mut().find(|(existing, _)| *existing == matcher) {
            Some(entry) => entry.1 = class,
            None => self.entries.push((matcher, class)),
        }
    }

    /// Merge several mappings in order
    pub fn extend<M, I>(&mut self, mappings: I)
    where
        M: Into<Matcher>,
        I: IntoIterator<Item = (M, Rc<PageClass>)>,
    {
        for (matcher, class) in mappings {
            self.define(matcher, class);
        }
    }

    /// Every class whose matcher matches, most specific first
    #[must_use]
    pub fn matches(&self, path: &str, url: &str) -> Vec<Rc<PageClass>> {
        let mut found: Vec<&(Matcher, Rc<PageClass>)> = self
            .entries
            .iter()
            .filter(|(matcher, _)| matcher.matches(path, url))
            .collect();
        found.sort_by_key(|(matcher, _)| matcher.specificity());
        found.into_iter().map(|(_, class)| Rc::clone(class)).collect()
    }

    /// Most specific class for the location
    #[must_use]
    pub fn find(&self, path: &str, url: &str) -> Option<Rc<PageClass>> {
        self.matches(path, url).into_iter().next()
    }

    /// Class mapped by exactly `matcher`
    #[must_use]
    pub fn get(&self, matcher: &Matcher) -> Option<&Rc<PageClass>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == matcher)
            .map(|(_, class)| class)
    }

    /// First matcher that maps to `class`, literals preferred
    #[must_use]
    pub fn key(&self, class: &Rc<PageClass>) -> Option<&Matcher> {
        let mut keys: Vec<&Matcher> = self
            .entries
            .iter()
            .filter(|(_, mapped)| Rc::ptr_eq(mapped, class))
            .map(|(matcher, _)| matcher)
            .collect();
        keys.sort_by_key(|matcher| matcher.specificity());
        keys.into_iter().next()
    }

    /// Navigable path for `class`
    ///
    /// # Errors
    ///
    /// [`PageError::InvalidUrl`] when `class` is unmapped or mapped only by patterns.
    pub fn path_for(&self, class: &Rc<PageClass>) -> PageResult<&str> {
        match self.key(class) {
            Some(Matcher::Literal(path)) => Ok(path),
            Some(Matcher::Pattern(_)) => Err(PageError::invalid_url(REGEXP_MAPPING_MSG)),
            None => Err(PageError::invalid_url(URL_MISSING_MSG)),
        }
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&Matcher, &Rc<PageClass>)> {
        self.entries.iter().map(|(matcher, class)| (matcher, class))
    }

    /// Number of mappings
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no mappings are defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn class(name: &str) -> Rc<PageClass> {
        Rc::new(PageClass::new(name))
    }

    fn names(classes: &[Rc<PageClass>]) -> Vec<&str> {
        classes.iter().map(|c| c.name()).collect()
    }

    mod matcher_tests {
        use super::*;

        #[test]
        fn test_literal_matches_path_or_url() {
            let matcher = Matcher::literal("/page");
            assert!(matcher.matches("/page", "http://x.com/page"));
            assert!(!matcher.matches("/page2", "http://x.com/page2"));
            assert!(Matcher::literal("http://x.com/page").matches("/page", "http://x.com/page"));
        }

        #[test]
        fn test_pattern_searches() {
            let matcher = Matcher::pattern(r"/page\d").unwrap();
            assert!(matcher.matches("/page2", ""));
            assert!(!matcher.matches("/page", ""));
        }

        #[test]
        fn test_invalid_pattern() {
            assert!(matches!(Matcher::pattern("(").unwrap_err(), PageError::InvalidPattern(_)));
        }

        #[test]
        fn test_equality_respects_kind() {
            assert_eq!(Matcher::literal("/a"), Matcher::from("/a"));
            assert_ne!(Matcher::literal("/a"), Matcher::pattern("/a").unwrap());
        }

        #[test]
        fn test_display() {
            assert_eq!(Matcher::literal("/a").to_string(), "\"/a\"");
            assert_eq!(Matcher::pattern("/a").unwrap().to_string(), "//a/");
        }
    }

    mod resolution_tests {
        use super::*;

        #[test]
        fn test_literal_beats_pattern() {
            let mut mappings = PageMappings::new();
            mappings.define("/page", class("A"));
            mappings.define(Matcher::pattern(r"/page\d").unwrap(), class("B"));
            assert_eq!(mappings.find("/page", "").unwrap().name(), "A");
            assert_eq!(mappings.find("/page2", "").unwrap().name(), "B");
        }

        #[test]
        fn test_literal_first_regardless_of_declaration() {
            let mut mappings = PageMappings::new();
            mappings.define(Matcher::pattern("/page").unwrap(), class("A"));
            mappings.define("/page", class("B"));
            assert_eq!(names(&mappings.matches("/page", "")), vec!["B", "A"]);
            assert_eq!(mappings.find("/page", "").unwrap().name(), "B");
        }

        #[test]
        fn test_no_match() {
            let mut mappings = PageMappings::new();
            mappings.define("/page", class("A"));
            assert!(mappings.find("/fake_page", "").is_none());
            assert!(mappings.matches("/fake_page", "").is_empty());
        }

        #[test]
        fn test_redefine_overwrites_in_place() {
            let mut mappings = PageMappings::new();
            mappings.define("/a", class("A"));
            mappings.define("/b", class("B"));
            mappings.define("/a", class("C"));
            assert_eq!(mappings.len(), 2);
            assert_eq!(mappings.get(&Matcher::literal("/a")).unwrap().name(), "C");
            assert_eq!(mappings.iter().next().unwrap().0, &Matcher::literal("/a"));
        }
    }

    mod path_for_tests {
        use super::*;

        #[test]
        fn test_literal_path() {
            let page = class("A");
            let mut mappings = PageMappings::new();
            mappings.extend([
                (Matcher::pattern("/x").unwrap(), Rc::clone(&page)),
                (Matcher::literal("/page"), Rc::clone(&page)),
            ]);
            assert_eq!(mappings.path_for(&page).unwrap(), "/page");
        }

        #[test]
        fn test_pattern_only() {
            let page = class("A");
            let mut mappings = PageMappings::new();
            mappings.define(Matcher::pattern("mapping").unwrap(), Rc::clone(&page));
            let err = mappings.path_for(&page).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid URL: {REGEXP_MAPPING_MSG}"));
        }

        #[test]
        fn test_unmapped() {
            let err = PageMappings::new().path_for(&class("A")).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid URL: {URL_MISSING_MSG}"));
        }
    }

    mod property_tests {
        use super::*;

        proptest! {
            #[test]
            fn prop_literals_precede_patterns(kinds in proptest::collection::vec(any::<bool>(), 1..12)) {
                let mut mappings = PageMappings::new();
                for (i, literal) in kinds.iter().enumerate() {
                    let page = class(&format!("P{i}"));
                    if *literal {
                        let location = if i % 2 == 0 { "/page" } else { "http://x.com/page" };
                        mappings.define(location, page);
                    } else {
                        mappings.define(Matcher::pattern(&format!("^/page(?:{i})?$")).unwrap(), page);
                    }
                }
                let found = mappings.matches("/page", "http://x.com/page");
                prop_assert_eq!(found.len(), mappings.len());
                let literals: Vec<bool> = found
                    .iter()
                    .map(|c| kinds[c.name()[1..].parse::<usize>().unwrap()])
                    .collect();
                let mut sorted = literals.clone();
                sorted.sort_by_key(|literal| !literal);
                prop_assert_eq!(literals, sorted);
            }

            #[test]
            fn prop_ties_keep_declaration_order(count in 1usize..10) {
                let mut mappings = PageMappings::new();
                for i in 0..count {
                    mappings.define(Matcher::pattern(&format!("^/p(/{i})?")).unwrap(), class(&format!("P{i}")));
                }
                let found = mappings.matches("/p", "");
                let expected: Vec<String> = (0..count).map(|i| format!("P{i}")).collect();
                prop_assert_eq!(names(&found), expected.iter().map(String::as_str).collect::<Vec<_>>());
            }
        }
    }
}
