//! Dynamic member access.
//!
//! Elements, pages and sessions answer names at runtime: their own built-in
//! members first, then helper methods, then declared sub-elements, and
//! finally (for elements) whatever the bound browser node exposes. Each stage
//! reports [`Lookup::Found`] or [`Lookup::NotFound`] so the caller decides
//! whether to fall through; only the outermost [`Members::send`] turns a miss
//! into [`PageError::NoSuchMember`].

use serde_json::Value;

use crate::element::Element;
use crate::result::{PageError, PageResult};

/// Value produced by dynamic member access
#[derive(Debug, Clone)]
pub enum Member {
    /// A declared (or helper-built) element
    Element(Element),
    /// A plain value read from a node, page or helper
    Value(Value),
}

impl Member {
    /// The element, if this member is one
    #[must_use]
    pub fn into_element(self) -> Option<Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Value(_) => None,
        }
    }

    /// The value, if this member is one
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Element(_) => None,
        }
    }

    /// Borrow the value, if this member is one
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Element(_) => None,
        }
    }

    /// Whether this member is an element
    #[must_use]
    pub const fn is_element(&self) -> bool {
        matches!(self, Self::Element(_))
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Element> for Member {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// Outcome of one lookup stage
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    /// The stage answered the name
    Found(T),
    /// The stage does not know the name
    NotFound,
}

impl<T> Lookup<T> {
    /// Convert to an option
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    /// Whether the stage answered
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Hosts that answer names at runtime
pub trait Members {
    /// Resolve `name` through this host's lookup chain
    fn lookup(&self, name: &str, args: &[Value]) -> PageResult<Lookup<Member>>;

    /// Whether `name` would resolve
    fn responds_to(&self, name: &str) -> bool;

    /// Short description used in error messages
    fn describe(&self) -> String;

    /// Resolve `name`, failing with [`PageError::NoSuchMember`] on a miss
    fn send(&self, name: &str, args: &[Value]) -> PageResult<Member> {
        match self.lookup(name, args)? {
            Lookup::Found(member) => Ok(member),
            Lookup::NotFound => Err(PageError::NoSuchMember {
                name: name.to_string(),
                host: self.describe(),
            }),
        }
    }

    /// Resolve `name` to a plain value
    fn value_of(&self, name: &str, args: &[Value]) -> PageResult<Value> {
        match self.send(name, args)? {
            Member::Value(value) => Ok(value),
            Member::Element(element) => Err(PageError::not_supported(format!(
                "'{name}' is the element {}, not a value",
                element.describe()
            ))),
        }
    }
}
