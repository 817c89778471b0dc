//! Selector to driver-query translation.
//!
//! A [`Selector`] is an ordered list of criteria. The first entry is the
//! locator (`css`, `xpath`, `id`, `name`, `label`, `text`); every other
//! entry is passed through to the browser driver as a query option
//! (`count`, `visible`, ...).
//!
//! Locator kinds are scoped by [`ElementType`]: `text` only makes sense for
//! links and buttons, `label` only for form fields. Translation is pure and
//! never touches the driver, so an unsupported combination fails before any
//! lookup happens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::result::{PageError, PageResult};

/// Fixed vocabulary of declarable element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Any node
    #[default]
    Element,
    /// Text input
    TextField,
    /// Checkbox input
    Checkbox,
    /// Select box
    SelectList,
    /// Radio button
    Radio,
    /// Multi-line text input
    TextArea,
    /// Anchor
    Link,
    /// Button
    Button,
    /// Composite element with its own sub-elements
    Section,
}

impl ElementType {
    /// Name used in declarations and error messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Element => "element",
            Self::TextField => "text_field",
            Self::Checkbox => "checkbox",
            Self::SelectList => "select_list",
            Self::Radio => "radio",
            Self::TextArea => "text_area",
            Self::Link => "link",
            Self::Button => "button",
            Self::Section => "section",
        }
    }

    /// Whether this is a form field type
    #[must_use]
    pub const fn is_field(self) -> bool {
        matches!(
            self,
            Self::TextField | Self::Checkbox | Self::SelectList | Self::Radio | Self::TextArea
        )
    }

    /// Driver query family used for type-scoped locators
    #[must_use]
    pub const fn query_kind(self) -> QueryKind {
        match self {
            Self::Link => QueryKind::Link,
            Self::Button => QueryKind::Button,
            Self::TextField | Self::Checkbox | Self::SelectList | Self::Radio | Self::TextArea => {
                QueryKind::Field
            }
            Self::Element | Self::Section => QueryKind::Css,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locator kinds accepted as the first selector criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorKind {
    /// CSS selector
    Css,
    /// XPath expression
    XPath,
    /// Element id
    Id,
    /// `name` attribute
    Name,
    /// Field label text
    Label,
    /// Link or button text
    Text,
}

impl LocatorKind {
    /// Parse a criterion name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "css" => Some(Self::Css),
            "xpath" => Some(Self::XPath),
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "label" => Some(Self::Label),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Whether this locator can be used for the given element type
    #[must_use]
    pub const fn supports(self, element_type: ElementType) -> bool {
        match self {
            Self::Label => element_type.is_field(),
            Self::Text => matches!(element_type, ElementType::Link | ElementType::Button),
            Self::Css | Self::XPath | Self::Id | Self::Name => true,
        }
    }
}

/// Kind of lookup requested from the browser driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// CSS selector lookup
    Css,
    /// XPath lookup
    XPath,
    /// Lookup by id
    Id,
    /// Form field by label, id or name
    Field,
    /// Link by text, id or title
    Link,
    /// Button by text, id or value
    Button,
}

impl QueryKind {
    /// Name passed to the driver
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::Id => "id",
            Self::Field => "field",
            Self::Link => "link",
            Self::Button => "button",
        }
    }
}

/// Driver query produced from a selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Lookup kind
    pub kind: QueryKind,
    /// Locator value
    pub locator: String,
    /// Options passed through verbatim
    pub options: Map<String, Value>,
}

impl Query {
    /// Create a query with no options
    #[must_use]
    pub fn new(kind: QueryKind, locator: impl Into<String>) -> Self {
        Self {
            kind,
            locator: locator.into(),
            options: Map::new(),
        }
    }

    /// Add an option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.options.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind.as_str(), self.locator)?;
        if !self.options.is_empty() {
            write!(f, " {}", Value::Object(self.options.clone()))?;
        }
        Ok(())
    }
}

/// Ordered selector criteria; the first entry is the locator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    criteria: Vec<(String, Value)>,
}

impl Selector {
    /// Empty selector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector whose locator is `kind => value`
    #[must_use]
    pub fn criterion(kind: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            criteria: vec![(kind.into(), value.into())],
        }
    }

    /// CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::criterion("css", Value::String(selector.into()))
    }

    /// XPath selector
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::criterion("xpath", Value::String(expression.into()))
    }

    /// Id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::criterion("id", Value::String(id.into()))
    }

    /// `name` attribute selector
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::criterion("name", Value::String(name.into()))
    }

    /// Field label selector
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::criterion("label", Value::String(label.into()))
    }

    /// Link/button text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::criterion("text", Value::String(text.into()))
    }

    /// Append a criterion, replacing any existing entry with the same key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.criteria.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.criteria.push((key, value)),
        }
        self
    }

    /// Whether no criteria were given
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// The locator entry
    #[must_use]
    pub fn primary(&self) -> Option<(&str, &Value)> {
        self.criteria.first().map(|(k, v)| (k.as_str(), v))
    }

    /// Every criterion after the locator
    #[must_use]
    pub fn options(&self) -> Map<String, Value> {
        self.criteria
            .iter()
            .skip(1)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Translate into a driver query for an element of `element_type`
    pub fn to_query(&self, element_type: ElementType) -> PageResult<Query> {
        let (kind, value) = self.primary().ok_or_else(|| PageError::UndefinedSelector {
            name: element_type.as_str().to_string(),
        })?;

        let locator = LocatorKind::parse(kind)
            .filter(|locator| locator.supports(element_type))
            .ok_or_else(|| PageError::UnsupportedCriteria {
                criteria: kind.to_string(),
                element_type: element_type.as_str().to_string(),
            })?;

        let value = value
            .as_str()
            .map_or_else(|| value.to_string(), str::to_string);

        let mut query = match locator {
            LocatorKind::Css => Query::new(QueryKind::Css, value),
            LocatorKind::XPath => Query::new(QueryKind::XPath, value),
            LocatorKind::Id => Query::new(QueryKind::Id, value),
            LocatorKind::Name => Query::new(QueryKind::Css, format!("*[name='{value}']")),
            LocatorKind::Label => Query::new(QueryKind::Field, value).with_option("exact", true),
            LocatorKind::Text => Query::new(element_type.query_kind(), value),
        };
        for (key, option) in self.options() {
            let _ = query.options.insert(key, option);
        }
        Ok(query)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_first_key_is_locator() {
            let selector = Selector::xpath("//a").with("count", 1);
            let (kind, value) = selector.primary().unwrap();
            assert_eq!(kind, "xpath");
            assert_eq!(value, &Value::from("//a"));
        }

        #[test]
        fn test_options_exclude_locator() {
            let selector = Selector::css(".row").with("count", 2).with("visible", true);
            let options = selector.options();
            assert_eq!(options.len(), 2);
            assert_eq!(options["count"], Value::from(2));
            assert_eq!(options["visible"], Value::from(true));
        }

        #[test]
        fn test_with_replaces_existing_key() {
            let selector = Selector::css(".row").with("count", 2).with("count", 3);
            assert_eq!(selector.options()["count"], Value::from(3));
        }

        #[test]
        fn test_empty() {
            assert!(Selector::new().is_empty());
            assert!(!Selector::id("x").is_empty());
        }
    }

    mod translation_tests {
        use super::*;

        #[test]
        fn test_css_passes_options_through() {
            let query = Selector::css(".form")
                .with("visible", true)
                .to_query(ElementType::Element)
                .unwrap();
            assert_eq!(query.kind, QueryKind::Css);
            assert_eq!(query.locator, ".form");
            assert_eq!(query.options["visible"], Value::from(true));
        }

        #[test]
        fn test_name_becomes_attribute_css() {
            let query = Selector::name("email")
                .to_query(ElementType::TextField)
                .unwrap();
            assert_eq!(query, Query::new(QueryKind::Css, "*[name='email']"));
        }

        #[test]
        fn test_label_is_exact_field_query() {
            let query = Selector::label("Email")
                .to_query(ElementType::TextField)
                .unwrap();
            assert_eq!(query.kind, QueryKind::Field);
            assert_eq!(query.options["exact"], Value::from(true));
        }

        #[test]
        fn test_text_uses_element_family() {
            let link = Selector::text("Sign in").to_query(ElementType::Link).unwrap();
            let button = Selector::text("Go").to_query(ElementType::Button).unwrap();
            assert_eq!(link.kind, QueryKind::Link);
            assert_eq!(button.kind, QueryKind::Button);
        }

        #[test]
        fn test_text_unsupported_for_plain_element() {
            let err = Selector::text("hello")
                .to_query(ElementType::Element)
                .unwrap_err();
            assert!(matches!(err, PageError::UnsupportedCriteria { ref criteria, .. } if criteria == "text"));
        }

        #[test]
        fn test_label_unsupported_for_link() {
            let err = Selector::label("x").to_query(ElementType::Link).unwrap_err();
            assert!(matches!(err, PageError::UnsupportedCriteria { .. }));
        }

        #[test]
        fn test_unknown_criterion_unsupported() {
            let err = Selector::criterion("colour", "red")
                .to_query(ElementType::Element)
                .unwrap_err();
            assert!(matches!(err, PageError::UnsupportedCriteria { .. }));
        }

        #[test]
        fn test_empty_selector_is_undefined() {
            let err = Selector::new().to_query(ElementType::Link).unwrap_err();
            assert!(matches!(err, PageError::UndefinedSelector { .. }));
        }

        #[test]
        fn test_query_display() {
            let query = Query::new(QueryKind::Link, "Home").with_option("count", 1);
            assert_eq!(query.to_string(), r#"link "Home" {"count":1}"#);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_css_locator_value_preserved(css in "[a-z.#]{1,20}", count in 0u32..10) {
                let query = Selector::css(css.clone())
                    .with("count", count)
                    .to_query(ElementType::Section)
                    .unwrap();
                prop_assert_eq!(query.locator, css);
                prop_assert_eq!(query.options.len(), 1);
            }
        }
    }
}
