//! Publishing a theme from props to a stable subtree

use std::cell::RefCell;
use std::rc::Rc;

use ctxstore::{children, component, create_state_publisher, PublisherProps, Root};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn main() -> ctxstore::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== State Publisher Example: Theme ===\n");

    let publisher = create_state_publisher(json!({"theme": "light", "accent": "blue"}), Some("Theme"));

    let reader = publisher.clone();
    let page = children(move || {
        let badge_reader = reader.clone();
        component("ThemeBadge", move || {
            let theme = badge_reader.use_shared_selector(|s: &Value| s["theme"].clone())?;
            println!("   [ThemeBadge] theme = {theme}");
            Ok(())
        })?;

        let accent_reader = reader.clone();
        component("AccentSwatch", move || {
            let accent = accent_reader.use_shared_selector(|s: &Value| s["accent"].clone())?;
            println!("   [AccentSwatch] accent = {accent}");
            Ok(())
        })?;

        component("Sidebar", || {
            println!("   [Sidebar] rendered");
            Ok(())
        })?;
        Ok(())
    });

    let props = Rc::new(RefCell::new(json!({"theme": "light", "accent": "blue"})));
    let root = Root::new();
    let (outer, current) = (publisher.clone(), Rc::clone(&props));
    let render = move || {
        let value = current.borrow().clone();
        outer.wrapper(PublisherProps::new(value, Rc::clone(&page)).stable_children(true))?;
        Ok(())
    };

    println!("1. Mounting with the light theme");
    root.render(render.clone())?;

    println!("\n2. Switching to dark (only ThemeBadge re-renders)");
    *props.borrow_mut() = json!({"theme": "dark", "accent": "blue"});
    root.render(render.clone())?;

    println!("\n3. Re-rendering with identical props (nothing re-renders)");
    root.render(render.clone())?;

    println!("\n4. Changing the accent");
    *props.borrow_mut() = json!({"theme": "dark", "accent": "orange"});
    root.render(render)?;

    println!("\n✓ Theme example complete!");
    Ok(())
}
