//! Counter with a reader, a selector reader and a write-only control

use std::cell::RefCell;
use std::rc::Rc;

use ctxstore::{children, component, create_context_store, ContextStore, Dispatch, Root};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn count_of(state: &Value) -> i64 {
    state["count"].as_i64().unwrap_or_default()
}

type Controls = Rc<RefCell<Option<Dispatch<Value>>>>;

fn counter_tree(store: &ContextStore<Value>, controls: Controls) -> ctxstore::Result<()> {
    let store_for_children = store.clone();
    store.wrapper(children(move || {
        let reader = store_for_children.clone();
        component("CountLabel", move || {
            let count = reader.use_store_selector(count_of)?;
            println!("   [CountLabel] count = {count}");
            Ok(())
        })?;

        let reader = store_for_children.clone();
        component("StateDump", move || {
            let state = reader.use_store_value()?;
            println!("   [StateDump] {state}");
            Ok(())
        })?;

        let (writer, controls) = (store_for_children.clone(), Rc::clone(&controls));
        component("ResetButton", move || {
            println!("   [ResetButton] rendered");
            *controls.borrow_mut() = Some(writer.use_store_dispatch()?);
            Ok(())
        })?;
        Ok(())
    }))?;
    Ok(())
}

fn main() -> ctxstore::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Context Store Example: Counter ===\n");

    let store = create_context_store(json!({"count": 0, "step": 1}), Some("Counter"));
    let controls: Controls = Rc::new(RefCell::new(None));

    println!("1. Mounting the tree");
    let root = Root::new();
    let (tree_store, tree_controls) = (store.clone(), Rc::clone(&controls));
    root.render(move || counter_tree(&tree_store, Rc::clone(&tree_controls)))?;

    let Some(dispatch) = controls.borrow().clone() else {
        println!("   no dispatch captured");
        return Ok(());
    };

    println!("\n2. Incrementing three times");
    for _ in 0..3 {
        dispatch.update(|prev| {
            let step = prev["step"].as_i64().unwrap_or(1);
            json!({"count": count_of(prev) + step, "step": step})
        });
    }

    println!("\n3. Changing the step (CountLabel stays put)");
    dispatch.merge(json!({"step": 5}));

    println!("\n4. Resetting");
    dispatch.merge(json!({"count": 0}));

    println!("\n✓ Counter example complete!");
    Ok(())
}
