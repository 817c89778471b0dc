//! Element declarations.
//!
//! Page classes, element classes and element instances each own an
//! [`ElementRegistry`]: the table of declared sub-elements plus helper
//! methods. Declaring is cheap and lazy; a definition's block only runs when
//! the element is instantiated, so forward references work and errors inside
//! a block surface only when that element is used.
//!
//! Registries are copied, never shared: a subclass or instance takes a
//! shallow duplicate at construction and later declarations on either side
//! stay local.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::driver::Node;
use crate::element::{Block, Element, ElementClass};
use crate::locator::{ElementType, Selector};
use crate::member::Member;
use crate::result::{PageError, PageResult};

/// Helper method attached to a host
pub type Method<H> = Rc<dyn Fn(&H, &[Value]) -> PageResult<Member>>;

/// Immutable declaration of a named element
#[derive(Clone)]
pub struct ElementDefinition {
    name: String,
    element_type: ElementType,
    selector: Selector,
    class: Rc<ElementClass>,
    options: Map<String, Value>,
    prefetched: Option<Rc<dyn Node>>,
    block: Option<Block>,
}

impl ElementDefinition {
    /// Declare `name` as an element of `element_type` located by `selector`
    #[must_use]
    pub fn new(name: impl Into<String>, element_type: ElementType, selector: Selector) -> Self {
        Self {
            name: name.into().to_lowercase(),
            element_type,
            selector,
            class: Rc::new(ElementClass::default()),
            options: Map::new(),
            prefetched: None,
            block: None,
        }
    }

    /// Section built from `class`; name and selector default to the class's own
    #[must_use]
    pub fn section(class: &Rc<ElementClass>, name: Option<&str>, selector: Option<Selector>) -> Self {
        let name = name.map_or_else(|| snake_case(class.name()), str::to_string);
        let selector = selector.unwrap_or_else(|| class.selector());
        Self::new(name, ElementType::Section, selector).with_class(Rc::clone(class))
    }

    /// Use `class` as the concrete element variant
    #[must_use]
    pub fn with_class(mut self, class: Rc<ElementClass>) -> Self {
        self.class = class;
        self
    }

    /// Attach free-form options
    #[must_use]
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Attach one option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.options.insert(key.into(), value.into());
        self
    }

    /// Bind to an already located node instead of searching
    #[must_use]
    pub fn with_prefetched(mut self, node: Rc<dyn Node>) -> Self {
        self.prefetched = Some(node);
        self
    }

    /// Configuration block run against each new instance
    #[must_use]
    pub fn with_block<F>(mut self, block: F) -> Self
    where
        F: Fn(&Element, &[Value]) -> PageResult<()> + 'static,
    {
        self.block = Some(Rc::new(block));
        self
    }

    /// Element name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Concrete element variant
    #[must_use]
    pub const fn class(&self) -> &Rc<ElementClass> {
        &self.class
    }

    /// Options
    #[must_use]
    pub const fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Prefetched node, if any
    #[must_use]
    pub const fn prefetched(&self) -> Option<&Rc<dyn Node>> {
        self.prefetched.as_ref()
    }

    /// Configuration block, if any
    #[must_use]
    pub fn block(&self) -> Option<&Block> {
        self.block.as_ref()
    }
}

impl PartialEq for ElementDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type
            && self.name == other.name
            && self.selector == other.selector
            && self.class.hooks() == other.class.hooks()
    }
}

impl fmt::Debug for ElementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDefinition")
            .field("name", &self.name)
            .field("element_type", &self.element_type)
            .field("selector", &self.selector)
            .field("class", &self.class.name())
            .field("options", &self.options)
            .field("prefetched", &self.prefetched.is_some())
            .field("block", &self.block.is_some())
            .finish()
    }
}

/// Declared sub-elements and helper methods of one host
pub struct ElementRegistry<H> {
    definitions: Vec<ElementDefinition>,
    methods: BTreeMap<String, Method<H>>,
    reserved: &'static [&'static str],
}

impl<H> Clone for ElementRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            definitions: self.definitions.clone(),
            methods: self.methods.clone(),
            reserved: self.reserved,
        }
    }
}

impl<H> fmt::Debug for ElementRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("elements", &self.element_names())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<H> ElementRegistry<H> {
    /// Empty registry; `reserved` are the host's built-in member names
    #[must_use]
    pub fn new(reserved: &'static [&'static str]) -> Self {
        Self {
            definitions: Vec::new(),
            methods: BTreeMap::new(),
            reserved,
        }
    }

    /// Register a definition
    pub fn define_element(&mut self, definition: ElementDefinition) -> PageResult<()> {
        let name = definition.name();
        if self.reserved.contains(&name) || self.methods.contains_key(name) {
            return Err(PageError::InvalidElementName {
                name: name.to_string(),
                message: "a method with that name is already defined".to_string(),
            });
        }
        if self.has_element(name) {
            return Err(PageError::InvalidElementName {
                name: name.to_string(),
                message: "an element with that name is already defined".to_string(),
            });
        }
        tracing::trace!(element = name, "element declared");
        self.definitions.push(definition);
        Ok(())
    }

    /// Register a helper method; redefining a method replaces it
    pub fn define_method(&mut self, name: impl Into<String>, method: Method<H>) -> PageResult<()> {
        let name = name.into();
        if self.has_element(&name) {
            return Err(PageError::InvalidMethodName { name });
        }
        let _ = self.methods.insert(name, method);
        Ok(())
    }

    /// Definition declared under `name` (names are case-insensitive)
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&ElementDefinition> {
        let name = name.to_lowercase();
        self.definitions.iter().find(|d| d.name() == name)
    }

    /// Helper method declared under `name`
    #[must_use]
    pub fn method(&self, name: &str) -> Option<Method<H>> {
        self.methods.get(name).cloned()
    }

    /// Whether an element is declared under `name`
    #[must_use]
    pub fn has_element(&self, name: &str) -> bool {
        self.definition(name).is_some()
    }

    /// Whether a helper method is declared under `name`
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Whether `name` is a built-in member of the host
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(&name)
    }

    /// Declared element names in declaration order
    #[must_use]
    pub fn element_names(&self) -> Vec<&str> {
        self.definitions.iter().map(ElementDefinition::name).collect()
    }

    /// Whether no elements are declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Whether any helper methods are declared
    #[must_use]
    pub fn has_methods(&self) -> bool {
        !self.methods.is_empty()
    }
}

/// Declaration surface shared by page classes, element classes and element instances
pub trait Elements {
    /// Receiver type of helper methods
    type Host;

    /// Run `f` with mutable access to the registry
    fn with_registry<R>(&self, f: impl FnOnce(&mut ElementRegistry<Self::Host>) -> R) -> R;

    /// Run `f` with shared access to the registry
    fn read_registry<R>(&self, f: impl FnOnce(&ElementRegistry<Self::Host>) -> R) -> R;

    /// Register a full definition
    fn declare(&self, definition: ElementDefinition) -> PageResult<&Self> {
        self.with_registry(|registry| registry.define_element(definition))?;
        Ok(self)
    }

    /// Generic element
    fn declare_element(&self, name: &str, selector: Selector) -> PageResult<&Self> {
        self.declare(ElementDefinition::new(name, ElementType::Element, selector))
    }

    /// Link
    fn declare_link(&self, name: &str, selector: Selector) -> PageResult<&Self> {
        self.declare(ElementDefinition::new(name, ElementType::Link, selector))
    }

    /// Button
    fn declare_button(&self, name: &str, selector: Selector) -> PageResult<&Self> {
        self.declare(ElementDefinition::new(name, ElementType::Button, selector))
    }

    /// Text field
    fn declare_text_field(&self, name: &str, selector: Selector) -> PageResult<&Self> {
        self.declare(ElementDefinition::new(name, ElementType::TextField, selector))
    }

    /// Checkbox
    fn declare_checkbox(&self, name: &str, selector: Selector) -> PageResult<&Self> {
        self.declare(ElementDefinition::new(name, ElementType::Checkbox, selector))
    }

    /// Select list
    fn declare_select_list(&self, name: &str, selector: Selector) -> PageResult<&Self> {
        self.declare(ElementDefinition::new(name, ElementType::SelectList, selector))
    }

    /// Radio button
    fn declare_radio(&self, name: &str, selector: Selector) -> PageResult<&Self> {
        self.declare(ElementDefinition::new(name, ElementType::Radio, selector))
    }

    /// Text area
    fn declare_text_area(&self, name: &str, selector: Selector) -> PageResult<&Self> {
        self.declare(ElementDefinition::new(name, ElementType::TextArea, selector))
    }

    /// Section configured by `block` when instantiated
    fn declare_section<F>(&self, name: &str, selector: Selector, block: F) -> PageResult<&Self>
    where
        F: Fn(&Element, &[Value]) -> PageResult<()> + 'static,
    {
        self.declare(ElementDefinition::new(name, ElementType::Section, selector).with_block(block))
    }

    /// Section built from a reusable element class
    fn declare_section_class(
        &self,
        class: &Rc<ElementClass>,
        name: Option<&str>,
        selector: Option<Selector>,
    ) -> PageResult<&Self> {
        self.declare(ElementDefinition::section(class, name, selector))
    }

    /// Element bound to an already located node
    fn declare_prefetched(&self, name: &str, node: Rc<dyn Node>) -> PageResult<&Self> {
        self.declare(
            ElementDefinition::new(name, ElementType::Element, Selector::new()).with_prefetched(node),
        )
    }

    /// Helper method callable through dynamic member access
    fn define_method<F>(&self, name: &str, method: F) -> PageResult<&Self>
    where
        F: Fn(&Self::Host, &[Value]) -> PageResult<Member> + 'static,
    {
        self.with_registry(|registry| registry.define_method(name, Rc::new(method)))?;
        Ok(self)
    }

    /// Copy of the definition declared under `name`
    fn element_definition(&self, name: &str) -> Option<ElementDefinition> {
        self.read_registry(|registry| registry.definition(name).cloned())
    }
}

/// `PageSection` -> `page_section`
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
