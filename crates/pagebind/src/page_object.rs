//! Page Object Model
//!
//! A [`PageClass`] describes one kind of page: its declared elements, helper
//! methods, an optional own URL and an on-load hook. A [`Page`] is a live
//! instance of a class bound to a browser driver; its elements are located
//! against the driver's document on first use.
//!
//! ```ignore
//! let login = Rc::new(PageClass::new("Login").with_url("/login"));
//! login
//!     .declare_text_field("username", Selector::label("Username"))?
//!     .declare_button("submit", Selector::text("Sign in"))?;
//!
//! let page = session.visit_page(&login, None)?;
//! page.element("username")?.set("bob")?;
//! page.element("submit")?.click()?;
//! ```

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::driver::{BrowserDriver, Node};
use crate::element::{Element, Parent};
use crate::elements::{ElementRegistry, Elements};
use crate::member::{Lookup, Member, Members};
use crate::result::{PageError, PageResult};
use crate::wait::{WaitOptions, Waiters};
use crate::watch::{Watchable, Watchers};

/// Built-in dynamic members of a page
pub const PAGE_MEMBERS: [&str; 2] = ["url", "path"];

/// Callback run after a page has been visited
pub type PageHook = Rc<dyn Fn(&Page) -> PageResult<()>>;

// =============================================================================
// PAGE CLASS
// =============================================================================

/// Declarations shared by every instance of one kind of page
pub struct PageClass {
    name: String,
    url: RefCell<Option<String>>,
    registry: RefCell<ElementRegistry<Page>>,
    on_load: RefCell<Option<PageHook>>,
}

impl fmt::Debug for PageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageClass")
            .field("name", &self.name)
            .field("url", &self.url.borrow())
            .field("registry", &self.registry.borrow())
            .field("on_load", &self.on_load.borrow().is_some())
            .finish()
    }
}

impl PageClass {
    /// Create an empty page class
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: RefCell::new(None),
            registry: RefCell::new(ElementRegistry::new(&PAGE_MEMBERS)),
            on_load: RefCell::new(None),
        }
    }

    /// Subclass inheriting a copy of `parent`'s declarations, url and on-load hook
    #[must_use]
    pub fn subclass(parent: &Self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: RefCell::new(parent.url()),
            registry: RefCell::new(parent.registry.borrow().clone()),
            on_load: RefCell::new(parent.on_load_hook()),
        }
    }

    /// Set the page's own url
    #[must_use]
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.set_url(url);
        self
    }

    /// Replace the page's own url
    pub fn set_url(&self, url: impl Into<String>) {
        *self.url.borrow_mut() = Some(url.into());
    }

    /// Page's own url, if declared
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.url.borrow().clone()
    }

    /// Class name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `hook` after each visit to this page
    pub fn on_load<F>(&self, hook: F) -> &Self
    where
        F: Fn(&Page) -> PageResult<()> + 'static,
    {
        *self.on_load.borrow_mut() = Some(Rc::new(hook));
        self
    }

    /// The on-load hook, if any
    #[must_use]
    pub fn on_load_hook(&self) -> Option<PageHook> {
        self.on_load.borrow().clone()
    }
}

impl Elements for PageClass {
    type Host = Page;

    fn with_registry<R>(&self, f: impl FnOnce(&mut ElementRegistry<Page>) -> R) -> R {
        f(&mut self.registry.borrow_mut())
    }

    fn read_registry<R>(&self, f: impl FnOnce(&ElementRegistry<Page>) -> R) -> R {
        f(&self.registry.borrow())
    }
}

// =============================================================================
// PAGE
// =============================================================================

pub(crate) struct PageInner {
    class: Rc<PageClass>,
    driver: Rc<dyn BrowserDriver>,
    wait: WaitOptions,
    registry: RefCell<ElementRegistry<Page>>,
    children: RefCell<HashMap<String, Element>>,
    watchers: RefCell<Watchers<Page>>,
}

/// Live instance of a [`PageClass`]
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

impl Page {
    /// Instance of `class` driven by `driver`, with default wait options
    #[must_use]
    pub fn new(class: &Rc<PageClass>, driver: Rc<dyn BrowserDriver>) -> Self {
        Self::with_wait(class, driver, WaitOptions::default())
    }

    /// Instance of `class` driven by `driver`
    #[must_use]
    pub fn with_wait(class: &Rc<PageClass>, driver: Rc<dyn BrowserDriver>, wait: WaitOptions) -> Self {
        tracing::trace!(page = class.name(), "page instantiated");
        Self {
            inner: Rc::new(PageInner {
                class: Rc::clone(class),
                driver,
                wait,
                registry: RefCell::new(class.registry.borrow().clone()),
                children: RefCell::new(HashMap::new()),
                watchers: RefCell::new(Watchers::default()),
            }),
        }
    }

    pub(crate) fn upgrade(inner: &Weak<PageInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// The class this page is an instance of
    #[must_use]
    pub fn class(&self) -> &Rc<PageClass> {
        &self.inner.class
    }

    /// Whether this page is an instance of `class`
    #[must_use]
    pub fn is_a(&self, class: &Rc<PageClass>) -> bool {
        Rc::ptr_eq(&self.inner.class, class)
    }

    /// Browser driver
    #[must_use]
    pub fn driver(&self) -> &Rc<dyn BrowserDriver> {
        &self.inner.driver
    }

    /// Root node that element lookups start from
    pub fn document(&self) -> PageResult<Rc<dyn Node>> {
        self.inner.driver.document()
    }

    /// Full url of the current location
    pub fn url(&self) -> PageResult<String> {
        self.inner.driver.current_url()
    }

    /// Path of the current location
    pub fn path(&self) -> PageResult<String> {
        self.inner.driver.current_path()
    }

    /// Execute JavaScript in the page
    pub fn execute_script(&self, script: &str) -> PageResult<Value> {
        self.inner.driver.execute_script(script)
    }

    /// Element `name`, built once and cached
    pub fn element(&self, name: &str) -> PageResult<Element> {
        let cached = self.inner.children.borrow().get(&name.to_lowercase()).cloned();
        match cached {
            Some(element) => Ok(element),
            None => self.element_by_name(name, &[]),
        }
    }

    /// Build a fresh element `name`, passing `args` to its block
    pub fn element_by_name(&self, name: &str, args: &[Value]) -> PageResult<Element> {
        let definition = self
            .element_definition(name)
            .ok_or_else(|| PageError::NoSuchMember {
                name: name.to_string(),
                host: self.describe(),
            })?;
        let element = Element::from_definition(&definition, Parent::Page(Rc::downgrade(&self.inner)), args)?;
        let _ = self
            .inner
            .children
            .borrow_mut()
            .insert(definition.name().to_string(), element.clone());
        Ok(element)
    }
}

impl Members for Page {
    fn lookup(&self, name: &str, args: &[Value]) -> PageResult<Lookup<Member>> {
        match name {
            "url" => return Ok(Lookup::Found(Member::Value(Value::String(self.url()?)))),
            "path" => return Ok(Lookup::Found(Member::Value(Value::String(self.path()?)))),
            _ => {}
        }

        let method = self.inner.registry.borrow().method(name);
        if let Some(method) = method {
            return method(self, args).map(Lookup::Found);
        }

        if self.inner.registry.borrow().has_element(name) {
            let element = if args.is_empty() {
                self.element(name)?
            } else {
                self.element_by_name(name, args)?
            };
            return Ok(Lookup::Found(Member::Element(element)));
        }

        let document = self.document()?;
        if document.responds_to(name) {
            return document.call(name, args).map(|v| Lookup::Found(Member::Value(v)));
        }
        Ok(Lookup::NotFound)
    }

    fn responds_to(&self, name: &str) -> bool {
        let registry = self.inner.registry.borrow();
        if registry.is_reserved(name) || registry.has_method(name) || registry.has_element(name) {
            return true;
        }
        drop(registry);
        self.document().is_ok_and(|document| document.responds_to(name))
    }

    fn describe(&self) -> String {
        format!("page '{}'", self.inner.class.name())
    }
}

impl Elements for Page {
    type Host = Self;

    fn with_registry<R>(&self, f: impl FnOnce(&mut ElementRegistry<Self>) -> R) -> R {
        f(&mut self.inner.registry.borrow_mut())
    }

    fn read_registry<R>(&self, f: impl FnOnce(&ElementRegistry<Self>) -> R) -> R {
        f(&self.inner.registry.borrow())
    }
}

impl Watchable for Page {
    fn watchers(&self) -> &RefCell<Watchers<Self>> {
        &self.inner.watchers
    }
}

impl Waiters for Page {
    fn wait_options(&self) -> WaitOptions {
        self.inner.wait
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("class", &self.inner.class.name())
            .field("wait", &self.inner.wait)
            .finish()
    }
}
