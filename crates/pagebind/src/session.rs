//! Browser session.
//!
//! A [`Session`] owns the browser driver handle, the URL-to-page mapping
//! table and the current page. Navigation either goes to an explicit url or
//! to a page class, whose url is taken from (in order) the caller, the class
//! itself, or the class's best literal mapping joined onto the base url.
//!
//! The current page is resolved lazily from the driver's location: it stays
//! cached while the location still belongs to it and is replaced by a fresh
//! instance of the most specific mapped class otherwise. An unmapped
//! location keeps whatever page was current.

use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use url::{ParseError, Url};

use crate::config::SessionConfig;
use crate::driver::BrowserDriver;
use crate::mapping::{Matcher, PageMappings};
use crate::member::{Lookup, Member, Members};
use crate::page_object::{Page, PageClass};
use crate::result::PageResult;
use crate::wait::{WaitOptions, Waiters};

/// Built-in dynamic members of a session
pub const SESSION_MEMBERS: [&str; 2] = ["current_url", "current_path"];

/// Join `path` onto `base` with exactly one `/` between them
///
/// ```
/// use pagebind::join_url;
///
/// assert_eq!(join_url("http://example.com/", "/home").unwrap(), "http://example.com/home");
/// assert_eq!(join_url("http://example.com/app", "home?tab=1").unwrap(), "http://example.com/app/home?tab=1");
/// ```
///
/// # Errors
///
/// [`PageError::MalformedUrl`](crate::PageError::MalformedUrl) when `base`
/// is not an absolute url.
pub fn join_url(base: &str, path: &str) -> PageResult<String> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let directory = format!("{}/", base.path());
        base.set_path(&directory);
    }
    Ok(base.join(path.trim_start_matches('/'))?.into())
}

/// Scheme and authority of `url`
fn origin(url: &str) -> PageResult<String> {
    Ok(Url::parse(url)?.origin().ascii_serialization())
}

/// Browser session: driver, page mappings and current page
pub struct Session {
    driver: Rc<dyn BrowserDriver>,
    config: SessionConfig,
    transitions: PageMappings,
    current_page: RefCell<Option<Page>>,
}

impl Session {
    /// Session driving `driver`, joining mapped paths onto `base_url` when given
    #[must_use]
    pub fn new(driver: Rc<dyn BrowserDriver>, base_url: Option<&str>) -> Self {
        let config = match base_url {
            Some(base_url) => SessionConfig::new().with_base_url(base_url),
            None => SessionConfig::new(),
        };
        Self::with_config(driver, config)
    }

    /// Session driving `driver` with explicit settings
    #[must_use]
    pub fn with_config(driver: Rc<dyn BrowserDriver>, config: SessionConfig) -> Self {
        Self {
            driver,
            config,
            transitions: PageMappings::new(),
            current_page: RefCell::new(None),
        }
    }

    /// Settings
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Browser driver
    #[must_use]
    pub fn driver(&self) -> &Rc<dyn BrowserDriver> {
        &self.driver
    }

    /// Merge `(matcher, page class)` pairs into the mapping table
    pub fn define_page_mappings<M, I>(&mut self, mappings: I) -> &mut Self
    where
        M: Into<Matcher>,
        I: IntoIterator<Item = (M, Rc<PageClass>)>,
    {
        self.transitions.extend(mappings);
        self
    }

    /// The mapping table
    #[must_use]
    pub const fn transitions(&self) -> &PageMappings {
        &self.transitions
    }

    /// Every mapped class matching `location`, most specific first
    #[must_use]
    pub fn matches(&self, location: &str) -> Vec<Rc<PageClass>> {
        self.transitions.matches(location, location)
    }

    /// Most specific mapped class for `location`
    #[must_use]
    pub fn find_mapped_page(&self, location: &str) -> Option<Rc<PageClass>> {
        self.transitions.find(location, location)
    }

    /// Full url of the current location
    pub fn current_url(&self) -> PageResult<String> {
        self.driver.current_url()
    }

    /// Path of the current location
    pub fn current_path(&self) -> PageResult<String> {
        self.driver.current_path()
    }

    /// Execute JavaScript through the driver
    ///
    /// # Errors
    ///
    /// [`PageError::NotSupported`](crate::PageError::NotSupported) when the
    /// driver cannot run scripts.
    pub fn execute_script(&self, script: &str) -> PageResult<Value> {
        self.driver.execute_script(script)
    }

    /// Navigate to `url` without choosing a page; the current page is
    /// resolved from the new location on next access
    pub fn visit_url(&self, url: &str) -> PageResult<()> {
        tracing::debug!(url, "visiting url");
        self.driver.visit(url)
    }

    /// Navigate to `class` and make a fresh instance of it current
    ///
    /// The instance only becomes current once its on-load hook succeeds.
    ///
    /// # Errors
    ///
    /// [`PageError::InvalidUrl`](crate::PageError::InvalidUrl) when no url can
    /// be derived for `class`; any error from the driver or the on-load hook.
    pub fn visit_page(&self, class: &Rc<PageClass>, url: Option<&str>) -> PageResult<Page> {
        let target = match url {
            Some(url) => url.to_string(),
            None => self.url_for(class)?,
        };
        tracing::debug!(page = class.name(), url = %target, "visiting page");
        self.driver.visit(&target)?;

        let page = self.instantiate(class);
        if let Some(on_load) = class.on_load_hook() {
            on_load(&page)?;
        }
        *self.current_page.borrow_mut() = Some(page.clone());
        Ok(page)
    }

    fn url_for(&self, class: &Rc<PageClass>) -> PageResult<String> {
        if let Some(url) = class.url() {
            return match Url::parse(&url) {
                Ok(_) => Ok(url),
                Err(ParseError::RelativeUrlWithoutBase) => join_url(&self.base_url()?, &url),
                Err(err) => Err(err.into()),
            };
        }
        let path = self.transitions.path_for(class)?;
        join_url(&self.base_url()?, path)
    }

    fn base_url(&self) -> PageResult<String> {
        match &self.config.base_url {
            Some(base_url) => Ok(base_url.clone()),
            None => origin(&self.driver.current_url()?),
        }
    }

    fn instantiate(&self, class: &Rc<PageClass>) -> Page {
        Page::with_wait(class, Rc::clone(&self.driver), self.config.wait_options())
    }

    /// Page for the driver's current location
    ///
    /// Returns the cached page while the location still belongs to it,
    /// otherwise a fresh instance of the most specific mapped class. An
    /// unmapped location leaves the cached page (possibly none) in place.
    pub fn current_page(&self) -> PageResult<Option<Page>> {
        let url = self.driver.current_url()?;
        let path = self.driver.current_path()?;
        let cached = self.current_page.borrow().clone();

        let own_url = cached.as_ref().and_then(|page| page.class().url());
        if own_url.is_some_and(|own| own == url || own == path) {
            return Ok(cached);
        }

        let Some(class) = self.transitions.find(&path, &url) else {
            tracing::trace!(%url, "no page mapped for location");
            return Ok(cached);
        };
        if let Some(page) = cached.as_ref().filter(|page| page.is_a(&class)) {
            return Ok(Some(page.clone()));
        }

        tracing::debug!(page = class.name(), %url, "resolved current page");
        let page = self.instantiate(&class);
        *self.current_page.borrow_mut() = Some(page.clone());
        Ok(Some(page))
    }
}

impl Members for Session {
    fn lookup(&self, name: &str, args: &[Value]) -> PageResult<Lookup<Member>> {
        match name {
            "current_url" => Ok(Lookup::Found(Member::Value(Value::String(self.current_url()?)))),
            "current_path" => Ok(Lookup::Found(Member::Value(Value::String(self.current_path()?)))),
            _ => match self.current_page()? {
                Some(page) => page.lookup(name, args),
                None => Ok(Lookup::NotFound),
            },
        }
    }

    fn responds_to(&self, name: &str) -> bool {
        SESSION_MEMBERS.contains(&name)
            || self
                .current_page()
                .ok()
                .flatten()
                .is_some_and(|page| page.responds_to(name))
    }

    fn describe(&self) -> String {
        "session".to_string()
    }
}

impl Waiters for Session {
    fn wait_options(&self) -> WaitOptions {
        self.config.wait_options()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("transitions", &self.transitions.len())
            .field("current_page", &self.current_page.borrow())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::elements::Elements;
    use crate::watch::Watchable;
    use crate::result::{PageError, REGEXP_MAPPING_MSG, UNSUPPORTED_OPERATION_MSG, URL_MISSING_MSG};
    use serde_json::json;
    use std::cell::Cell;

    const BASE: &str = "http://url.com";

    fn mock() -> Rc<MockDriver> {
        Rc::new(MockDriver::default().at(format!("{BASE}/somepath")))
    }

    fn session(driver: &Rc<MockDriver>) -> Session {
        Session::new(Rc::clone(driver) as Rc<dyn BrowserDriver>, Some(BASE))
    }

    fn page_class(name: &str) -> Rc<PageClass> {
        Rc::new(PageClass::new(name))
    }

    mod join_url_tests {
        use super::*;

        #[test]
        fn test_all_slash_combinations() {
            for base in ["http://example.com", "http://example.com/"] {
                for path in ["home", "/home"] {
                    assert_eq!(join_url(base, path).unwrap(), "http://example.com/home");
                }
            }
        }

        #[test]
        fn test_base_with_path_keeps_it() {
            assert_eq!(join_url("http://example.com/app", "/home").unwrap(), "http://example.com/app/home");
        }

        #[test]
        fn test_relative_base_is_malformed() {
            let err = join_url("/relative", "home").unwrap_err();
            assert!(matches!(err, PageError::MalformedUrl(_)));
        }

        #[test]
        fn test_origin() {
            assert_eq!(origin("http://example.com/a/b").unwrap(), "http://example.com");
            assert_eq!(origin("http://example.com").unwrap(), "http://example.com");
            assert_eq!(origin("http://url.com?next=/a").unwrap(), "http://url.com");
            assert!(origin("/relative").is_err());
        }
    }

    mod visit_tests {
        use super::*;

        #[test]
        fn test_uses_base_url_and_mapping() {
            let driver = mock();
            let page = page_class("Page");
            let mut session = session(&driver);
            session.define_page_mappings([("/page", Rc::clone(&page))]);
            let visited = session.visit_page(&page, None).unwrap();
            assert!(driver.was_called("visit:http://url.com/page"));
            assert!(visited.is_a(&page));
            assert!(session.current_page().unwrap().unwrap().is_a(&page));
        }

        #[test]
        fn test_explicit_url_wins() {
            let driver = mock();
            let page = Rc::new(PageClass::new("Page").with_url("http://other.com/own"));
            let session = session(&driver);
            session.visit_page(&page, Some("http://url.com/explicit")).unwrap();
            assert!(driver.was_called("visit:http://url.com/explicit"));
        }

        #[test]
        fn test_class_url_beats_mapping() {
            let driver = mock();
            let page = Rc::new(PageClass::new("Page").with_url("/own"));
            let mut session = session(&driver);
            session.define_page_mappings([("/mapped", Rc::clone(&page))]);
            session.visit_page(&page, None).unwrap();
            assert!(driver.was_called("visit:http://url.com/own"));
        }

        #[test]
        fn test_base_defaults_to_current_origin() {
            let driver = mock();
            let page = page_class("Page");
            let mut session = Session::new(Rc::clone(&driver) as Rc<dyn BrowserDriver>, None);
            session.define_page_mappings([("/page", Rc::clone(&page))]);
            session.visit_page(&page, None).unwrap();
            assert!(driver.was_called("visit:http://url.com/page"));
        }

        #[test]
        fn test_origin_ignores_query_of_current_location() {
            let driver = Rc::new(MockDriver::default().at("http://url.com?x=1"));
            let page = page_class("Page");
            let mut session = Session::new(Rc::clone(&driver) as Rc<dyn BrowserDriver>, None);
            session.define_page_mappings([("/home", Rc::clone(&page))]);
            session.visit_page(&page, None).unwrap();
            assert_eq!(driver.history(), vec!["visit:http://url.com/home".to_string()]);
        }

        #[test]
        fn test_no_mapping() {
            let driver = mock();
            let err = session(&driver).visit_page(&page_class("Page"), None).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid URL: {URL_MISSING_MSG}"));
            assert!(driver.history().is_empty());
        }

        #[test]
        fn test_pattern_mapping_not_navigable() {
            let driver = mock();
            let page = page_class("Page");
            let mut session = session(&driver);
            session.define_page_mappings([(Matcher::pattern("mapping").unwrap(), Rc::clone(&page))]);
            let err = session.visit_page(&page, None).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid URL: {REGEXP_MAPPING_MSG}"));
        }

        #[test]
        fn test_on_load_hook_runs_with_new_page() {
            let driver = mock();
            let page = page_class("Page");
            let called = Rc::new(Cell::new(false));
            let flag = Rc::clone(&called);
            page.on_load(move |loaded| {
                flag.set(loaded.class().name() == "Page");
                Ok(())
            });
            let mut session = session(&driver);
            session.define_page_mappings([("/page", Rc::clone(&page))]);
            session.visit_page(&page, None).unwrap();
            assert!(called.get());
        }

        #[test]
        fn test_failing_on_load_keeps_previous_page() {
            let driver = mock();
            let first = Rc::new(PageClass::new("First").with_url("/first"));
            let broken = Rc::new(PageClass::new("Broken").with_url("/broken"));
            broken.on_load(|_| Err(PageError::not_supported("not ready")));
            let session = session(&driver);

            session.visit_page(&first, None).unwrap();
            let err = session.visit_page(&broken, None).unwrap_err();
            assert!(matches!(err, PageError::NotSupported { ref message } if message == "not ready"));
            assert!(driver.was_called("visit:http://url.com/broken"));
            assert!(session.current_page().unwrap().unwrap().is_a(&first));
        }

        #[test]
        fn test_driver_failure_leaves_no_page() {
            let driver = Rc::new(
                MockDriver::default()
                    .at(format!("{BASE}/somepath"))
                    .with_visit_failure("offline"),
            );
            let page = Rc::new(PageClass::new("Page").with_url("/page"));
            let session = session(&driver);

            let err = session.visit_page(&page, None).unwrap_err();
            assert!(matches!(err, PageError::Driver { .. }));
            assert!(session.current_page().unwrap().is_none());
        }

        #[test]
        fn test_visit_url() {
            let driver = mock();
            session(&driver).visit_url("http://url.com/page").unwrap();
            assert!(driver.was_called("visit:http://url.com/page"));
        }
    }

    mod current_page_tests {
        use super::*;

        fn setup() -> (Rc<MockDriver>, Session, Rc<PageClass>, Rc<PageClass>) {
            let driver = mock();
            let page = Rc::new(PageClass::new("Page").with_url(BASE));
            let another = Rc::new(PageClass::new("Another").with_url("http://www.example.com/another_page1"));
            let mut session = session(&driver);
            session.define_page_mappings([("/another_page1", Rc::clone(&another))]);
            session.visit_page(&page, Some(BASE)).unwrap();
            (driver, session, page, another)
        }

        #[test]
        fn test_unchanged_location_keeps_page() {
            let (driver, session, page, _) = setup();
            driver.set_url(BASE);
            let current = session.current_page().unwrap().unwrap();
            assert!(current.is_a(&page));
        }

        #[test]
        fn test_changed_location_resolves_mapping() {
            let (driver, session, _, another) = setup();
            driver.set_url("http://www.example.com/another_page1");
            let current = session.current_page().unwrap().unwrap();
            assert!(current.is_a(&another));
        }

        #[test]
        fn test_unmapped_location_keeps_previous() {
            let (driver, session, page, _) = setup();
            driver.set_url("http://url.com/nowhere");
            assert!(session.current_page().unwrap().unwrap().is_a(&page));
        }

        #[test]
        fn test_none_before_first_visit() {
            let driver = mock();
            assert!(session(&driver).current_page().unwrap().is_none());
        }

        #[test]
        fn test_slash_in_query_does_not_match_mapping() {
            let driver = Rc::new(MockDriver::default().at("http://url.com?next=/admin"));
            let admin = page_class("Admin");
            let mut session = session(&driver);
            session.define_page_mappings([("/admin", Rc::clone(&admin))]);
            assert_eq!(session.current_path().unwrap(), "/");
            assert!(session.current_page().unwrap().is_none());
        }

        #[test]
        fn test_location_without_path_is_root() {
            let driver = Rc::new(MockDriver::default().at("http://url.com"));
            let root = page_class("Root");
            let mut session = session(&driver);
            session.define_page_mappings([("/", Rc::clone(&root))]);
            assert!(session.current_page().unwrap().unwrap().is_a(&root));
        }

        #[test]
        fn test_same_class_is_cached() {
            let driver = mock();
            let page = page_class("Page");
            let mut session = session(&driver);
            session.define_page_mappings([("/page", Rc::clone(&page))]);
            driver.set_url("http://url.com/page");
            let first = session.current_page().unwrap().unwrap();
            first.watch_with("marker", |_| Ok(json!(1))).unwrap();
            let second = session.current_page().unwrap().unwrap();
            assert_eq!(second.watched_value("marker"), Some(json!(1)));
        }
    }

    mod mapping_tests {
        use super::*;

        #[test]
        fn test_literal_key_is_normalised() {
            let driver = mock();
            let page = page_class("Page");
            let mut session = session(&driver);
            session.define_page_mappings([("/path", Rc::clone(&page))]);
            assert!(Rc::ptr_eq(session.transitions().get(&Matcher::literal("/path")).unwrap(), &page));
        }

        #[test]
        fn test_matches_ordered_by_specificity() {
            let driver = mock();
            let regex_page = page_class("Regex");
            let string_page = page_class("String");
            let mut session = session(&driver);
            session
                .define_page_mappings([(Matcher::pattern("/page").unwrap(), Rc::clone(&regex_page))])
                .define_page_mappings([("/page", Rc::clone(&string_page))]);
            let found = session.matches("/page");
            assert!(Rc::ptr_eq(&found[0], &string_page));
            assert!(Rc::ptr_eq(&found[1], &regex_page));
            assert!(Rc::ptr_eq(&session.find_mapped_page("/page").unwrap(), &string_page));
            assert!(session.find_mapped_page("/fake_page").is_none());
        }
    }

    mod delegation_tests {
        use super::*;

        #[test]
        fn test_own_members() {
            let driver = mock();
            let session = session(&driver);
            assert_eq!(session.value_of("current_url", &[]).unwrap(), json!("http://url.com/somepath"));
            assert_eq!(session.current_path().unwrap(), "/somepath");
            assert!(session.responds_to("current_url"));
        }

        #[test]
        fn test_delegates_to_current_page() {
            let driver = mock();
            let page = page_class("Page");
            page.define_method("my_method", |_: &Page, _: &[Value]| Ok(Member::from(json!("called"))))
                .unwrap();
            let session = session(&driver);
            session.visit_page(&page, Some("http://url.com/page")).unwrap();
            assert!(session.responds_to("my_method"));
            assert_eq!(session.value_of("my_method", &[]).unwrap(), json!("called"));
        }

        #[test]
        fn test_missing_member_without_page() {
            let driver = mock();
            let err = session(&driver).send("my_method", &[]).unwrap_err();
            assert!(matches!(err, PageError::NoSuchMember { .. }));
        }
    }

    mod script_tests {
        use super::*;

        #[test]
        fn test_execute_script() {
            let driver = Rc::new(MockDriver::default().with_script_result("result"));
            let session = Session::new(Rc::clone(&driver) as Rc<dyn BrowserDriver>, None);
            assert_eq!(session.execute_script("script").unwrap(), json!("result"));
        }

        #[test]
        fn test_execute_script_unsupported() {
            let err = session(&mock()).execute_script("script").unwrap_err();
            assert_eq!(err.to_string(), format!("Not supported: {UNSUPPORTED_OPERATION_MSG}"));
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_pages_inherit_wait_options() {
            let driver = mock();
            let config = SessionConfig::new().with_wait_timeout(10).with_retry_every(1);
            let session = Session::with_config(Rc::clone(&driver) as Rc<dyn BrowserDriver>, config);
            let page = session.visit_page(&page_class("Page"), Some("http://url.com/x")).unwrap();
            assert_eq!(page.wait_options().timeout_ms, 10);
            assert!(matches!(session.wait_until(|| false).unwrap_err(), PageError::Timeout { ms: 10 }));
        }
    }
}
