//! Elements
//!
//! An [`Element`] is a named, lazily bound handle onto one browser node. It
//! is located through its parent (a page or an enclosing section) the first
//! time it is used; the bound node is wrapped so every interaction verb runs
//! the element's before/after hooks.
//!
//! Elements can carry their own sub-elements and helper methods, which makes
//! them sections. Reusable section shapes are expressed as an
//! [`ElementClass`]: a registry of declarations, a default selector and
//! class-level hooks that each instance copies when it is built.
//!
//! ## Member lookup order
//!
//! 1. built-in members (`click`, `set`, `url`, ...)
//! 2. helper methods
//! 3. declared sub-elements
//! 4. members exposed by the bound node

use serde_json::{Map, Value};
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::driver::Node;
use crate::elements::{ElementDefinition, ElementRegistry, Elements};
use crate::locator::{ElementType, Query, Selector};
use crate::member::{Lookup, Member, Members};
use crate::page_object::{Page, PageInner};
use crate::result::{PageError, PageResult};
use crate::wait::{WaitOptions, Waiters};
use crate::watch::{Watchable, Watchers};

/// Interaction verbs that trigger event hooks
pub const EVENT_TYPES: [&str; 5] = ["set", "select", "select_option", "unselect_option", "click"];

/// Built-in dynamic members of an element
pub const ELEMENT_MEMBERS: [&str; 8] = [
    "set",
    "select",
    "select_option",
    "unselect_option",
    "click",
    "url",
    "path",
    "name",
];

/// Callback run around interaction verbs
pub type Hook = Rc<dyn Fn(&Element) -> PageResult<()>>;

/// Configuration block run against a new element instance
pub type Block = Rc<dyn Fn(&Element, &[Value]) -> PageResult<()>>;

/// Whether `name` is an interaction verb
#[must_use]
pub fn is_event(name: &str) -> bool {
    EVENT_TYPES.contains(&name)
}

// =============================================================================
// EVENT HOOKS
// =============================================================================

/// Ordered before/after hook lists
#[derive(Clone, Default)]
pub struct EventHooks {
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl EventHooks {
    /// Append a before hook
    pub fn push_before(&mut self, hook: Hook) {
        self.before.push(hook);
    }

    /// Append an after hook
    pub fn push_after(&mut self, hook: Hook) {
        self.after.push(hook);
    }

    /// Before hooks in registration order
    #[must_use]
    pub fn before(&self) -> &[Hook] {
        &self.before
    }

    /// After hooks in registration order
    #[must_use]
    pub fn after(&self) -> &[Hook] {
        &self.after
    }

    /// Whether no hooks are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

fn same_hooks(a: &[Hook], b: &[Hook]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Rc::ptr_eq(x, y))
}

impl PartialEq for EventHooks {
    fn eq(&self, other: &Self) -> bool {
        same_hooks(&self.before, &other.before) && same_hooks(&self.after, &other.after)
    }
}

impl fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

// =============================================================================
// ELEMENT CLASS
// =============================================================================

/// Reusable element variant: declarations, default selector and hooks
pub struct ElementClass {
    name: String,
    selector: RefCell<Selector>,
    registry: RefCell<ElementRegistry<Element>>,
    hooks: RefCell<EventHooks>,
}

impl Default for ElementClass {
    fn default() -> Self {
        Self::new("Element")
    }
}

impl fmt::Debug for ElementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementClass")
            .field("name", &self.name)
            .field("selector", &self.selector.borrow())
            .field("registry", &self.registry.borrow())
            .field("hooks", &self.hooks.borrow())
            .finish()
    }
}

impl ElementClass {
    /// Empty class
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: RefCell::new(Selector::new()),
            registry: RefCell::new(ElementRegistry::new(&ELEMENT_MEMBERS)),
            hooks: RefCell::new(EventHooks::default()),
        }
    }

    /// Subclass inheriting a copy of `parent`'s declarations, selector and hooks
    #[must_use]
    pub fn subclass(parent: &Self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: RefCell::new(parent.selector()),
            registry: RefCell::new(parent.registry.borrow().clone()),
            hooks: RefCell::new(parent.hooks()),
        }
    }

    /// Set the default selector
    #[must_use]
    pub fn with_selector(self, selector: Selector) -> Self {
        self.set_selector(selector);
        self
    }

    /// Replace the default selector
    pub fn set_selector(&self, selector: Selector) {
        *self.selector.borrow_mut() = selector;
    }

    /// Class name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default selector
    #[must_use]
    pub fn selector(&self) -> Selector {
        self.selector.borrow().clone()
    }

    /// Copy of the class-level hooks
    #[must_use]
    pub fn hooks(&self) -> EventHooks {
        self.hooks.borrow().clone()
    }

    /// Run `hook` before every interaction verb on instances
    pub fn before_events<F>(&self, hook: F) -> &Self
    where
        F: Fn(&Element) -> PageResult<()> + 'static,
    {
        self.hooks.borrow_mut().push_before(Rc::new(hook));
        self
    }

    /// Run `hook` after every interaction verb on instances
    pub fn after_events<F>(&self, hook: F) -> &Self
    where
        F: Fn(&Element) -> PageResult<()> + 'static,
    {
        self.hooks.borrow_mut().push_after(Rc::new(hook));
        self
    }

    /// Snapshot `name` (or its `attribute`) before every interaction verb
    pub fn watch(&self, name: &str, attribute: Option<&str>) -> &Self {
        let name = name.to_string();
        let attribute = attribute.map(str::to_string);
        self.before_events(move |element| {
            let _ = element.watch(&name, attribute.as_deref())?;
            Ok(())
        })
    }

    /// Standalone instance of this class bound to `node`
    #[must_use]
    pub fn instance(&self, name: &str, node: Rc<dyn Node>) -> Element {
        Element::construct(
            name,
            ElementType::Section,
            self.selector(),
            self,
            Parent::Orphan,
            Some(node),
            Map::new(),
        )
    }
}

impl Elements for ElementClass {
    type Host = Element;

    fn with_registry<R>(&self, f: impl FnOnce(&mut ElementRegistry<Element>) -> R) -> R {
        f(&mut self.registry.borrow_mut())
    }

    fn read_registry<R>(&self, f: impl FnOnce(&ElementRegistry<Element>) -> R) -> R {
        f(&self.registry.borrow())
    }
}

// =============================================================================
// OWNERSHIP
// =============================================================================

#[derive(Clone)]
pub(crate) enum Parent {
    Page(Weak<PageInner>),
    Element(Weak<ElementInner>),
    Orphan,
}

impl Parent {
    fn owner(&self) -> Option<Owner> {
        match self {
            Self::Page(page) => Page::upgrade(page).map(Owner::Page),
            Self::Element(element) => element.upgrade().map(|inner| Owner::Element(Element { inner })),
            Self::Orphan => None,
        }
    }
}

/// What an element is scoped to
#[derive(Debug, Clone)]
pub enum Owner {
    /// Declared directly on a page
    Page(Page),
    /// Declared inside a section
    Element(Element),
}

impl Owner {
    /// Node that lookups for children start from
    pub fn node(&self) -> PageResult<Rc<dyn Node>> {
        match self {
            Self::Page(page) => page.document(),
            Self::Element(element) => element.resolve(),
        }
    }

    /// Page at the root of the ownership chain
    #[must_use]
    pub fn page(&self) -> Option<Page> {
        match self {
            Self::Page(page) => Some(page.clone()),
            Self::Element(element) => element.page(),
        }
    }
}

// =============================================================================
// HOOKED NODE
// =============================================================================

/// Bound node whose interaction verbs run the element's hooks
#[derive(Debug)]
struct HookedNode {
    raw: Rc<dyn Node>,
    element: Weak<ElementInner>,
    name: String,
    hooks: EventHooks,
}

impl HookedNode {
    fn run(&self, hooks: &[Hook], element: &Element) -> PageResult<()> {
        hooks.iter().try_for_each(|hook| hook(element))
    }
}

impl Node for HookedNode {
    fn find(&self, query: &Query) -> PageResult<Rc<dyn Node>> {
        self.raw.find(query)
    }

    fn responds_to(&self, member: &str) -> bool {
        self.raw.responds_to(member)
    }

    fn call(&self, member: &str, args: &[Value]) -> PageResult<Value> {
        if !is_event(member) || self.hooks.is_empty() || !self.raw.responds_to(member) {
            return self.raw.call(member, args);
        }
        let element = self
            .element
            .upgrade()
            .map(|inner| Element { inner })
            .ok_or_else(|| PageError::Detached {
                name: self.name.clone(),
            })?;
        tracing::trace!(element = %self.name, verb = member, "running event hooks");
        self.run(self.hooks.before(), &element)?;
        let result = self.raw.call(member, args)?;
        self.run(self.hooks.after(), &element)?;
        Ok(result)
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

pub(crate) struct ElementInner {
    name: String,
    element_type: ElementType,
    selector: Selector,
    parent: Parent,
    options: Map<String, Value>,
    prefetched: Option<Rc<dyn Node>>,
    bound: OnceCell<Rc<dyn Node>>,
    hooks: RefCell<EventHooks>,
    registry: RefCell<ElementRegistry<Element>>,
    children: RefCell<HashMap<String, Element>>,
    watchers: RefCell<Watchers<Element>>,
}

/// Named, lazily bound handle onto one browser node
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl Element {
    /// Standalone element of the base class
    #[must_use]
    pub fn new(name: &str, element_type: ElementType, selector: Selector) -> Self {
        Self::construct(
            name,
            element_type,
            selector,
            &ElementClass::default(),
            Parent::Orphan,
            None,
            Map::new(),
        )
    }

    /// Standalone element bound to an already located node
    #[must_use]
    pub fn prefetched(name: &str, node: Rc<dyn Node>) -> Self {
        Self::construct(
            name,
            ElementType::Element,
            Selector::new(),
            &ElementClass::default(),
            Parent::Orphan,
            Some(node),
            Map::new(),
        )
    }

    fn construct(
        name: &str,
        element_type: ElementType,
        selector: Selector,
        class: &ElementClass,
        parent: Parent,
        prefetched: Option<Rc<dyn Node>>,
        options: Map<String, Value>,
    ) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                name: name.to_lowercase(),
                element_type,
                selector,
                parent,
                options,
                prefetched,
                bound: OnceCell::new(),
                hooks: RefCell::new(class.hooks()),
                registry: RefCell::new(class.registry.borrow().clone()),
                children: RefCell::new(HashMap::new()),
                watchers: RefCell::new(Watchers::default()),
            }),
        }
    }

    /// Instantiate `definition` under `parent`, running its block with `args`
    pub(crate) fn from_definition(
        definition: &ElementDefinition,
        parent: Parent,
        args: &[Value],
    ) -> PageResult<Self> {
        let element = Self::construct(
            definition.name(),
            definition.element_type(),
            definition.selector().clone(),
            definition.class(),
            parent,
            definition.prefetched().cloned(),
            definition.options().clone(),
        );
        if let Some(block) = definition.block() {
            let _ = element.expand(args, |e, a| block(e, a))?;
        }
        Ok(element)
    }

    /// Run a configuration block against this instance
    pub fn expand<F>(&self, args: &[Value], block: F) -> PageResult<&Self>
    where
        F: FnOnce(&Self, &[Value]) -> PageResult<()>,
    {
        block(self, args)?;
        Ok(self)
    }

    /// Element name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Element type
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.inner.element_type
    }

    /// Selector
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.inner.selector
    }

    /// Definition options
    #[must_use]
    pub fn options(&self) -> &Map<String, Value> {
        &self.inner.options
    }

    /// Page or section this element is scoped to
    #[must_use]
    pub fn parent(&self) -> Option<Owner> {
        self.inner.parent.owner()
    }

    /// Page at the root of the ownership chain
    #[must_use]
    pub fn page(&self) -> Option<Page> {
        self.parent().and_then(|owner| owner.page())
    }

    /// Whether the node has been located
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.bound.get().is_some()
    }

    /// Whether this element declares sub-elements or helper methods
    #[must_use]
    pub fn is_section(&self) -> bool {
        let registry = self.inner.registry.borrow();
        !registry.is_empty() || registry.has_methods()
    }

    /// Locate (once) and return the hook-wrapped node
    ///
    /// # Errors
    ///
    /// Fails with [`PageError::UndefinedSelector`] when there is neither a
    /// selector nor a prefetched node, [`PageError::Detached`] when the
    /// owning page or section is gone, or whatever the driver reports.
    pub fn resolve(&self) -> PageResult<Rc<dyn Node>> {
        if let Some(node) = self.inner.bound.get() {
            return Ok(Rc::clone(node));
        }

        let raw = match &self.inner.prefetched {
            Some(node) => Rc::clone(node),
            None => self.locate()?,
        };
        let hooked: Rc<dyn Node> = Rc::new(HookedNode {
            raw,
            element: Rc::downgrade(&self.inner),
            name: self.inner.name.clone(),
            hooks: self.inner.hooks.borrow().clone(),
        });
        Ok(Rc::clone(self.inner.bound.get_or_init(|| hooked)))
    }

    fn locate(&self) -> PageResult<Rc<dyn Node>> {
        if self.inner.selector.is_empty() {
            return Err(PageError::UndefinedSelector {
                name: self.inner.name.clone(),
            });
        }
        let query = self.inner.selector.to_query(self.inner.element_type)?;
        let scope = self
            .parent()
            .ok_or_else(|| PageError::Detached {
                name: self.inner.name.clone(),
            })?
            .node()?;
        tracing::debug!(element = %self.inner.name, %query, "locating element");
        scope.find(&query)
    }

    // -------------------------------------------------------------------------
    // hooks
    // -------------------------------------------------------------------------

    /// Run `hook` before every interaction verb
    pub fn before_events<F>(&self, hook: F) -> &Self
    where
        F: Fn(&Self) -> PageResult<()> + 'static,
    {
        self.inner.hooks.borrow_mut().push_before(Rc::new(hook));
        self
    }

    /// Run `hook` after every interaction verb
    pub fn after_events<F>(&self, hook: F) -> &Self
    where
        F: Fn(&Self) -> PageResult<()> + 'static,
    {
        self.inner.hooks.borrow_mut().push_after(Rc::new(hook));
        self
    }

    /// Copy of this element's hooks
    #[must_use]
    pub fn hooks(&self) -> EventHooks {
        self.inner.hooks.borrow().clone()
    }

    // -------------------------------------------------------------------------
    // interaction
    // -------------------------------------------------------------------------

    /// Click
    pub fn click(&self) -> PageResult<Value> {
        self.trigger("click", &[])
    }

    /// Set the value of a field
    pub fn set(&self, value: impl Into<Value>) -> PageResult<Value> {
        self.trigger("set", &[value.into()])
    }

    /// Select `value`
    pub fn select(&self, value: impl Into<Value>) -> PageResult<Value> {
        self.trigger("select", &[value.into()])
    }

    /// Select this option
    pub fn select_option(&self) -> PageResult<Value> {
        self.trigger("select_option", &[])
    }

    /// Unselect this option
    pub fn unselect_option(&self) -> PageResult<Value> {
        self.trigger("unselect_option", &[])
    }

    fn trigger(&self, verb: &str, args: &[Value]) -> PageResult<Value> {
        let node = self.resolve()?;
        if !node.responds_to(verb) {
            return Err(PageError::event_not_supported(verb));
        }
        node.call(verb, args)
    }

    /// Text of the bound node
    pub fn text(&self) -> PageResult<Value> {
        self.resolve()?.call("text", &[])
    }

    /// Full url of the owning page
    pub fn url(&self) -> PageResult<String> {
        self.owning_page()?.url()
    }

    /// Path of the owning page
    pub fn path(&self) -> PageResult<String> {
        self.owning_page()?.path()
    }

    fn owning_page(&self) -> PageResult<Page> {
        self.page().ok_or_else(|| PageError::Detached {
            name: self.inner.name.clone(),
        })
    }

    // -------------------------------------------------------------------------
    // sub-elements
    // -------------------------------------------------------------------------

    /// Sub-element `name`, built once and cached
    pub fn element(&self, name: &str) -> PageResult<Self> {
        let cached = self.inner.children.borrow().get(&name.to_lowercase()).cloned();
        match cached {
            Some(element) => Ok(element),
            None => self.element_by_name(name, &[]),
        }
    }

    /// Build a fresh sub-element `name`, passing `args` to its block
    pub fn element_by_name(&self, name: &str, args: &[Value]) -> PageResult<Self> {
        let definition = self
            .element_definition(name)
            .ok_or_else(|| PageError::NoSuchMember {
                name: name.to_string(),
                host: self.describe(),
            })?;
        let element = Self::from_definition(&definition, Parent::Element(Rc::downgrade(&self.inner)), args)?;
        let _ = self
            .inner
            .children
            .borrow_mut()
            .insert(definition.name().to_string(), element.clone());
        Ok(element)
    }

    fn own_member(&self, name: &str, args: &[Value]) -> PageResult<Lookup<Member>> {
        let value = match name {
            verb if is_event(verb) => self.trigger(verb, args)?,
            "url" => Value::String(self.url()?),
            "path" => Value::String(self.path()?),
            "name" => Value::String(self.inner.name.clone()),
            _ => return Ok(Lookup::NotFound),
        };
        Ok(Lookup::Found(Member::Value(value)))
    }
}

impl Members for Element {
    fn lookup(&self, name: &str, args: &[Value]) -> PageResult<Lookup<Member>> {
        if let Lookup::Found(member) = self.own_member(name, args)? {
            return Ok(Lookup::Found(member));
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

        let node = self.resolve()?;
        if node.responds_to(name) {
            return node.call(name, args).map(|v| Lookup::Found(Member::Value(v)));
        }
        Ok(Lookup::NotFound)
    }

    fn responds_to(&self, name: &str) -> bool {
        let registry = self.inner.registry.borrow();
        if registry.is_reserved(name) || registry.has_method(name) || registry.has_element(name) {
            return true;
        }
        drop(registry);
        self.resolve().is_ok_and(|node| node.responds_to(name))
    }

    fn describe(&self) -> String {
        format!("element '{}'", self.inner.name)
    }
}

impl Elements for Element {
    type Host = Self;

    fn with_registry<R>(&self, f: impl FnOnce(&mut ElementRegistry<Self>) -> R) -> R {
        f(&mut self.inner.registry.borrow_mut())
    }

    fn read_registry<R>(&self, f: impl FnOnce(&ElementRegistry<Self>) -> R) -> R {
        f(&self.inner.registry.borrow())
    }
}

impl Watchable for Element {
    fn watchers(&self) -> &RefCell<Watchers<Self>> {
        &self.inner.watchers
    }
}

impl Waiters for Element {
    fn wait_options(&self) -> WaitOptions {
        self.page().map_or_else(WaitOptions::default, |page| page.wait_options())
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.inner.element_type == other.inner.element_type
            && self.inner.name == other.inner.name
            && self.inner.selector == other.inner.selector
            && *self.inner.hooks.borrow() == *other.inner.hooks.borrow()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.inner.name)
            .field("element_type", &self.inner.element_type)
            .field("selector", &self.inner.selector)
            .field("bound", &self.is_bound())
            .finish()
    }
}
