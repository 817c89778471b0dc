//! Browser driver boundary.
//!
//! pagebind never talks to a browser itself. Everything it needs from the
//! automation backend is expressed by two traits:
//!
//! - [`Node`]: a live node that can look up descendants, report which
//!   members it exposes, and invoke them (`click`, `set`, `text`, ...).
//! - [`BrowserDriver`]: the session-level handle (location, navigation,
//!   script execution and the document node).
//!
//! Backends are swappable; [`MockDriver`] and [`MockNode`] provide an
//! in-memory implementation for unit-testing page models.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use url::Url;

use crate::locator::Query;
use crate::result::{PageError, PageResult, UNSUPPORTED_OPERATION_MSG};

/// A live node owned by the browser driver
pub trait Node: fmt::Debug {
    /// Find exactly one node matching `query` within this node's subtree
    fn find(&self, query: &Query) -> PageResult<Rc<dyn Node>>;

    /// Whether this node exposes `member`
    fn responds_to(&self, member: &str) -> bool;

    /// Invoke `member` with `args`
    fn call(&self, member: &str, args: &[Value]) -> PageResult<Value>;
}

/// Session-level browser driver capabilities
pub trait BrowserDriver: fmt::Debug {
    /// Full url of the current location
    fn current_url(&self) -> PageResult<String>;

    /// Path component of the current location
    fn current_path(&self) -> PageResult<String>;

    /// Navigate to `url`
    fn visit(&self, url: &str) -> PageResult<()>;

    /// Root node that page-level lookups are scoped to
    fn document(&self) -> PageResult<Rc<dyn Node>>;

    /// Execute JavaScript in the page; unsupported unless overridden
    fn execute_script(&self, script: &str) -> PageResult<Value> {
        let _ = script;
        Err(PageError::not_supported(UNSUPPORTED_OPERATION_MSG))
    }
}

/// Path component of `url` (no scheme, host, query or fragment)
///
/// A location that is already relative is returned without its query and
/// fragment.
#[must_use]
pub fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

/// In-memory node for tests
#[derive(Debug, Default)]
pub struct MockNode {
    id: String,
    properties: RefCell<Map<String, Value>>,
    verbs: BTreeSet<String>,
    children: Vec<(Query, Rc<MockNode>)>,
    call_history: RefCell<Vec<String>>,
}

impl MockNode {
    /// Create a node with no members or children
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Expose a readable member
    #[must_use]
    pub fn with_property(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self
            .properties
            .borrow_mut()
            .insert(name.into(), value.into());
        self
    }

    /// Expose an interaction verb
    #[must_use]
    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        let _ = self.verbs.insert(verb.into());
        self
    }

    /// Register `child` as the answer to `query` (options are ignored when matching)
    #[must_use]
    pub fn with_child(mut self, query: Query, child: Rc<MockNode>) -> Self {
        self.children.push((query, child));
        self
    }

    /// Node id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Overwrite a readable member
    pub fn set_property(&self, name: impl Into<String>, value: impl Into<Value>) {
        let _ = self
            .properties
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    /// Current value of a readable member
    #[must_use]
    pub fn property(&self, name: &str) -> Option<Value> {
        self.properties.borrow().get(name).cloned()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.call_history.borrow().clone()
    }

    /// Check if a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.call_history
            .borrow()
            .iter()
            .any(|call| call.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.call_history.borrow_mut().push(call);
    }
}

impl Node for MockNode {
    fn find(&self, query: &Query) -> PageResult<Rc<dyn Node>> {
        self.record(format!("find:{query}"));
        let mut found = self
            .children
            .iter()
            .filter(|(q, _)| q.kind == query.kind && q.locator == query.locator)
            .map(|(_, child)| child);

        match (found.next(), found.next()) {
            (Some(child), None) => Ok(Rc::clone(child) as Rc<dyn Node>),
            (None, _) => Err(PageError::ElementNotFound {
                query: query.to_string(),
            }),
            (Some(_), Some(_)) => Err(PageError::AmbiguousMatch {
                query: query.to_string(),
                count: 2 + found.count(),
            }),
        }
    }

    fn responds_to(&self, member: &str) -> bool {
        self.verbs.contains(member) || self.properties.borrow().contains_key(member)
    }

    fn call(&self, member: &str, args: &[Value]) -> PageResult<Value> {
        self.record(format!("{member}:{}", Value::Array(args.to_vec())));

        if self.verbs.contains(member) {
            match member {
                "set" | "select" => {
                    self.set_property("value", args.first().cloned().unwrap_or(Value::Null));
                }
                "select_option" => self.set_property("selected", true),
                "unselect_option" => self.set_property("selected", false),
                _ => {}
            }
            return Ok(Value::Bool(true));
        }

        self.property(member).ok_or_else(|| PageError::NoSuchMember {
            name: member.to_string(),
            host: format!("node '{}'", self.id),
        })
    }
}

/// In-memory browser driver for tests
#[derive(Debug)]
pub struct MockDriver {
    current_url: RefCell<String>,
    document: Rc<MockNode>,
    script_result: Option<Value>,
    visit_failure: Option<String>,
    call_history: RefCell<Vec<String>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new(Rc::new(MockNode::new("document")))
    }
}

impl MockDriver {
    /// Create a driver serving `document`
    #[must_use]
    pub fn new(document: Rc<MockNode>) -> Self {
        Self {
            current_url: RefCell::new(String::new()),
            document,
            script_result: None,
            visit_failure: None,
            call_history: RefCell::new(Vec::new()),
        }
    }

    /// Start at `url`
    #[must_use]
    pub fn at(self, url: impl Into<String>) -> Self {
        *self.current_url.borrow_mut() = url.into();
        self
    }

    /// Enable script execution, answering with `result`
    #[must_use]
    pub fn with_script_result(mut self, result: impl Into<Value>) -> Self {
        self.script_result = Some(result.into());
        self
    }

    /// Fail every visit with a driver error carrying `message`
    #[must_use]
    pub fn with_visit_failure(mut self, message: impl Into<String>) -> Self {
        self.visit_failure = Some(message.into());
        self
    }

    /// Change location without recording a visit (e.g. after a link click)
    pub fn set_url(&self, url: impl Into<String>) {
        *self.current_url.borrow_mut() = url.into();
    }

    /// The document node
    #[must_use]
    pub fn document_node(&self) -> Rc<MockNode> {
        Rc::clone(&self.document)
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.call_history.borrow().clone()
    }

    /// Check if a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.call_history
            .borrow()
            .iter()
            .any(|call| call.starts_with(prefix))
    }
}

impl BrowserDriver for MockDriver {
    fn current_url(&self) -> PageResult<String> {
        Ok(self.current_url.borrow().clone())
    }

    fn current_path(&self) -> PageResult<String> {
        Ok(url_path(&self.current_url.borrow()))
    }

    fn visit(&self, url: &str) -> PageResult<()> {
        self.call_history.borrow_mut().push(format!("visit:{url}"));
        if let Some(message) = &self.visit_failure {
            return Err(PageError::driver(message.clone()));
        }
        *self.current_url.borrow_mut() = url.to_string();
        Ok(())
    }

    fn document(&self) -> PageResult<Rc<dyn Node>> {
        Ok(Rc::clone(&self.document) as Rc<dyn Node>)
    }

    fn execute_script(&self, script: &str) -> PageResult<Value> {
        self.call_history
            .borrow_mut()
            .push(format!("execute_script:{script}"));
        self.script_result
            .clone()
            .ok_or_else(|| PageError::not_supported(UNSUPPORTED_OPERATION_MSG))
    }
}
