//! Example: Page Object Model
//!
//! Demonstrates: declaring pages and sections, visiting them, hooks,
//! watchers and URL-to-page resolution against the in-memory driver.
//!
//! Run with: `cargo run --example page_object`

use pagebind::prelude::*;
use std::rc::Rc;

fn main() -> PageResult<()> {
    println!("=== Page Object Model Example ===\n");

    // 1. A fake browser with a login form
    println!("1. Building the in-memory document...");
    let username = Rc::new(MockNode::new("username").with_verb("set"));
    let submit = Rc::new(MockNode::new("submit").with_verb("click"));
    let status = Rc::new(MockNode::new("status").with_property("text", "signed out"));
    let form = MockNode::new("form")
        .with_child(Query::new(QueryKind::Field, "Username"), Rc::clone(&username))
        .with_child(Query::new(QueryKind::Button, "Sign in"), Rc::clone(&submit));
    let document = MockNode::new("document")
        .with_child(Query::new(QueryKind::Css, "form#login"), Rc::new(form))
        .with_child(Query::new(QueryKind::Id, "status"), Rc::clone(&status));
    let driver = Rc::new(MockDriver::new(Rc::new(document)).at("http://localhost:8080/"));

    // 2. Page classes
    println!("\n2. Declaring page classes...");
    let login = Rc::new(PageClass::new("Login"));
    login
        .declare_section("form", Selector::css("form#login"), |form, _| {
            form.declare_text_field("username", Selector::label("Username"))?
                .declare_button("submit", Selector::text("Sign in"))?;
            Ok(())
        })?
        .declare_element("status", Selector::id("status"))?;
    let account = Rc::new(PageClass::new("Account"));
    println!("   Login: {:?}", login.element_definition("form").map(|d| d.element_type()));

    // 3. Session and mappings
    println!("\n3. Mapping urls to pages...");
    let config = SessionConfig::from_yaml("base_url: http://localhost:8080\nwait_timeout_ms: 500\n")?;
    let mut session = Session::with_config(driver.clone(), config);
    session.define_page_mappings([
        (Matcher::literal("/login"), Rc::clone(&login)),
        (Matcher::pattern(r"^/accounts/\d+$")?, Rc::clone(&account)),
    ]);
    for (matcher, class) in session.transitions().iter() {
        println!("   {matcher} -> {}", class.name());
    }

    // 4. Visit and interact
    println!("\n4. Visiting the login page...");
    let page = session.visit_page(&login, None)?;
    println!("   Now at {}", page.url()?);

    let form = page.element("form")?;
    let submit_button = form.element("submit")?;
    submit_button.before_events(|e| {
        println!("   about to trigger {}", e.name());
        Ok(())
    });
    page.watch("status", Some("text"))?;

    form.element("username")?.set("ada")?;
    submit_button.click()?;
    status.set_property("text", "signed in");
    println!("   status changed: {}", page.changed("status")?);

    // 5. Resolve the current page after navigation
    println!("\n5. Following a redirect...");
    driver.set_url("http://localhost:8080/accounts/7");
    if let Some(current) = session.current_page()? {
        println!("   Current page: {}", current.class().name());
    }

    println!("\n=== Page Object Model Example Complete ===");
    Ok(())
}
