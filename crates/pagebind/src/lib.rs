//! Pagebind: Declarative Page Objects for Browser Acceptance Tests
//!
//! Describe a page as a tree of named, typed elements; pagebind binds them
//! lazily to a live browser session, wraps interactions with before/after
//! hooks, detects value changes and resolves the browser location to the
//! right page class.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PAGEBIND Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ PageClass  │    │ Element    │    │ Browser    │            │
//! │   │ + Registry │───►│ (lazy,     │───►│ Driver     │            │
//! │   │            │    │  hooked)   │    │ (Node)     │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         ▲                                    │                  │
//! │         │        ┌────────────────┐          │                  │
//! │         └────────│ Session        │◄─────────┘                  │
//! │                  │ (url → page)   │   current url / path        │
//! │                  └────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use pagebind::prelude::*;
//! use std::rc::Rc;
//!
//! let document = MockNode::new("document").with_child(
//!     Query::new(QueryKind::Link, "Next"),
//!     Rc::new(MockNode::new("next").with_verb("click")),
//! );
//! let driver = Rc::new(MockDriver::new(Rc::new(document)));
//!
//! let home = Rc::new(PageClass::new("Home"));
//! home.declare_link("next", Selector::text("Next")).unwrap();
//!
//! let mut session = Session::new(driver.clone(), Some("http://example.com"));
//! session.define_page_mappings([("/home", Rc::clone(&home))]);
//!
//! let page = session.visit_page(&home, None).unwrap();
//! page.element("next").unwrap().click().unwrap();
//! assert!(driver.was_called("visit:http://example.com/home"));
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod config;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
mod driver;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod element;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod elements;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod locator;
#[allow(clippy::missing_errors_doc)]
mod mapping;
#[allow(clippy::missing_errors_doc)]
mod member;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
mod page_object;
mod result;
#[allow(clippy::missing_errors_doc)]
mod session;

/// Wait Mechanisms
///
/// Polling `wait_until` with timeout and retry interval.
pub mod wait;

/// Watchers
///
/// Snapshot a named value and detect later changes.
#[allow(clippy::missing_errors_doc)]
pub mod watch;

pub use config::SessionConfig;
pub use driver::{url_path, BrowserDriver, MockDriver, MockNode, Node};
pub use element::{
    is_event, Block, Element, ElementClass, EventHooks, Hook, Owner, ELEMENT_MEMBERS, EVENT_TYPES,
};
pub use elements::{ElementDefinition, ElementRegistry, Elements, Method};
pub use locator::{ElementType, LocatorKind, Query, QueryKind, Selector};
pub use mapping::{Matcher, PageMappings};
pub use member::{Lookup, Member, Members};
pub use page_object::{Page, PageClass, PageHook, PAGE_MEMBERS};
pub use result::{
    PageError, PageResult, ELEMENT_MISSING_MSG, EVENT_NOT_SUPPORTED_MSG, REGEXP_MAPPING_MSG,
    UNSUPPORTED_OPERATION_MSG, URL_MISSING_MSG,
};
pub use session::{join_url, Session, SESSION_MEMBERS};
pub use wait::{wait_until, WaitOptions, Waiters, DEFAULT_RETRY_EVERY_MS, DEFAULT_WAIT_TIMEOUT_MS};
pub use watch::{Watchable, Watcher, Watchers};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        BrowserDriver, Element, ElementClass, ElementDefinition, ElementType, Elements, Matcher,
        Member, Members, MockDriver, MockNode, Node, Page, PageClass, PageError, PageResult,
        Query, QueryKind, Selector, Session, SessionConfig, WaitOptions, Waiters, Watchable,
    };
}
