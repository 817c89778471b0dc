//! Watchers
//!
//! A watcher snapshots a named value on its host (an element or a page) so
//! a later [`Watchable::changed`] can tell whether it moved. The value comes
//! either from dynamic member access (optionally reading one attribute of
//! the result) or from a user block.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::member::{Member, Members};
use crate::result::{PageError, PageResult, ELEMENT_MISSING_MSG};

/// Block computing a watched value
pub type WatchBlock<H> = Rc<dyn Fn(&H) -> PageResult<Value>>;

enum Accessor<H> {
    Member { attribute: Option<String> },
    Block(WatchBlock<H>),
}

impl<H> Clone for Accessor<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Member { attribute } => Self::Member {
                attribute: attribute.clone(),
            },
            Self::Block(block) => Self::Block(Rc::clone(block)),
        }
    }
}

/// Named value snapshot
pub struct Watcher<H> {
    name: String,
    accessor: Accessor<H>,
    last: Value,
}

impl<H> Clone for Watcher<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            accessor: self.accessor.clone(),
            last: self.last.clone(),
        }
    }
}

impl<H> fmt::Debug for Watcher<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accessor = match &self.accessor {
            Accessor::Member { attribute } => format!("member({attribute:?})"),
            Accessor::Block(_) => "block".to_string(),
        };
        f.debug_struct("Watcher")
            .field("name", &self.name)
            .field("accessor", &accessor)
            .field("last", &self.last)
            .finish()
    }
}

impl<H: Members> Watcher<H> {
    /// Watch the member `name`, or its `attribute` when given
    #[must_use]
    pub fn new(name: impl Into<String>, attribute: Option<&str>) -> Self {
        Self {
            name: name.into(),
            accessor: Accessor::Member {
                attribute: attribute.map(str::to_string),
            },
            last: Value::Null,
        }
    }

    /// Watch whatever `block` computes
    #[must_use]
    pub fn with_block(name: impl Into<String>, block: WatchBlock<H>) -> Self {
        Self {
            name: name.into(),
            accessor: Accessor::Block(block),
            last: Value::Null,
        }
    }

    /// Watcher name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last recorded value
    #[must_use]
    pub const fn last(&self) -> &Value {
        &self.last
    }

    /// Recompute and store the current value
    pub fn check(&mut self, host: &H) -> PageResult<&Value> {
        self.last = self.compute(host)?;
        Ok(&self.last)
    }

    /// Compute the current value without storing it
    pub fn compute(&self, host: &H) -> PageResult<Value> {
        match &self.accessor {
            Accessor::Block(block) => block(host),
            Accessor::Member { attribute } => {
                let member = host.send(&self.name, &[])?;
                match (member, attribute) {
                    (Member::Value(value), None) => Ok(value),
                    (Member::Value(value), Some(attribute)) => {
                        value.get(attribute).cloned().ok_or_else(|| PageError::NoSuchMember {
                            name: attribute.clone(),
                            host: format!("value of '{}'", self.name),
                        })
                    }
                    (Member::Element(element), Some(attribute)) => element.value_of(attribute, &[]),
                    (Member::Element(element), None) => Err(PageError::not_supported(format!(
                        "watching the element {} needs an attribute or a block",
                        element.describe()
                    ))),
                }
            }
        }
    }
}

/// Watchers registered on one host, keyed by name
pub struct Watchers<H> {
    watchers: BTreeMap<String, Watcher<H>>,
}

impl<H> Default for Watchers<H> {
    fn default() -> Self {
        Self {
            watchers: BTreeMap::new(),
        }
    }
}

impl<H> fmt::Debug for Watchers<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.watchers.values()).finish()
    }
}

impl<H> Watchers<H> {
    /// Register `watcher`, replacing one with the same name
    pub fn insert(&mut self, watcher: Watcher<H>) {
        let _ = self.watchers.insert(watcher.name.clone(), watcher);
    }

    /// Watcher registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Watcher<H>> {
        self.watchers.get(name)
    }

    /// Registered names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.watchers.keys().map(String::as_str).collect()
    }

    /// Whether nothing is watched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

/// Watch support for element and page hosts
pub trait Watchable: Members + Sized {
    /// This host's watchers
    fn watchers(&self) -> &RefCell<Watchers<Self>>;

    /// Snapshot the member `name` (or its `attribute`)
    ///
    /// # Errors
    ///
    /// Fails with [`PageError::ElementMissing`] when `name` does not resolve
    /// on this host, or with the error raised while reading the value.
    fn watch(&self, name: &str, attribute: Option<&str>) -> PageResult<&Self> {
        if !self.responds_to(name) {
            return Err(PageError::ElementMissing {
                name: name.to_string(),
                message: ELEMENT_MISSING_MSG.to_string(),
            });
        }
        self.register_watcher(Watcher::new(name, attribute))
    }

    /// Snapshot the value computed by `block`
    ///
    /// # Errors
    ///
    /// Propagates any error raised by the first evaluation of `block`.
    fn watch_with<F>(&self, name: &str, block: F) -> PageResult<&Self>
    where
        F: Fn(&Self) -> PageResult<Value> + 'static,
    {
        self.register_watcher(Watcher::with_block(name, Rc::new(block)))
    }

    /// Whether the watched value differs from its snapshot
    ///
    /// # Errors
    ///
    /// Fails with [`PageError::UnknownWatcher`] if `name` was never watched.
    fn changed(&self, name: &str) -> PageResult<bool> {
        let watcher = self
            .watchers()
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| PageError::UnknownWatcher {
                name: name.to_string(),
            })?;
        let current = watcher.compute(self)?;
        Ok(*watcher.last() != current)
    }

    /// Snapshot recorded by the watcher `name`
    fn watched_value(&self, name: &str) -> Option<Value> {
        self.watchers().borrow().get(name).map(|w| w.last().clone())
    }

    #[doc(hidden)]
    fn register_watcher(&self, mut watcher: Watcher<Self>) -> PageResult<&Self> {
        let _ = watcher.check(self)?;
        tracing::trace!(watcher = watcher.name(), value = %watcher.last(), "watching");
        self.watchers().borrow_mut().insert(watcher);
        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::member::Lookup;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Default, Debug)]
    struct Counter {
        count: Cell<i64>,
        watchers: RefCell<Watchers<Counter>>,
    }

    impl Members for Counter {
        fn lookup(&self, name: &str, _args: &[Value]) -> PageResult<Lookup<Member>> {
            Ok(match name {
                "count" => Lookup::Found(Member::from(json!(self.count.get()))),
                "stats" => Lookup::Found(Member::from(json!({ "total": self.count.get() * 10 }))),
                _ => Lookup::NotFound,
            })
        }

        fn responds_to(&self, name: &str) -> bool {
            matches!(name, "count" | "stats")
        }

        fn describe(&self) -> String {
            "counter".to_string()
        }
    }

    impl Watchable for Counter {
        fn watchers(&self) -> &RefCell<Watchers<Self>> {
            &self.watchers
        }
    }

    #[test]
    fn test_unchanged_after_watch() {
        let counter = Counter::default();
        counter.watch("count", None).unwrap();
        assert!(!counter.changed("count").unwrap());
        assert_eq!(counter.watched_value("count"), Some(json!(0)));
    }

    #[test]
    fn test_changed_after_mutation() {
        let counter = Counter::default();
        counter.watch("count", None).unwrap();
        counter.count.set(1);
        assert!(counter.changed("count").unwrap());
    }

    #[test]
    fn test_attribute_of_value() {
        let counter = Counter::default();
        counter.watch("stats", Some("total")).unwrap();
        assert_eq!(counter.watched_value("stats"), Some(json!(0)));
        counter.count.set(2);
        assert!(counter.changed("stats").unwrap());
    }

    #[test]
    fn test_block_watcher() {
        let counter = Counter::default();
        counter
            .watch_with("parity", |c: &Counter| Ok(json!(c.count.get() % 2)))
            .unwrap();
        counter.count.set(2);
        assert!(!counter.changed("parity").unwrap());
        counter.count.set(3);
        assert!(counter.changed("parity").unwrap());
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = Counter::default().watch("bobbins", None).unwrap_err();
        assert_eq!(err.to_string(), format!("{ELEMENT_MISSING_MSG}: bobbins"));
    }

    #[test]
    fn test_changed_without_watch() {
        let err = Counter::default().changed("count").unwrap_err();
        assert!(matches!(err, PageError::UnknownWatcher { .. }));
    }

    #[test]
    fn test_rewatch_replaces_snapshot() {
        let counter = Counter::default();
        counter.watch("count", None).unwrap();
        counter.count.set(5);
        counter.watch("count", None).unwrap();
        assert!(!counter.changed("count").unwrap());
        assert_eq!(counter.watchers.borrow().names(), vec!["count"]);
    }
}
