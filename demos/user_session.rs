//! Session store walkthrough: login, profile refresh, logout.
//!
//! Run with `RUST_LOG=session_signals=trace` to see the store's logging.

use session_signals::{create_effect, SessionSnapshot, StoreError, UserStore};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), StoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== User Session Example ===\n");

    let store = UserStore::get()?;

    // A header that only cares about the display name.
    let _header = create_effect({
        let username = store.username.clone();
        move || match username.get().as_str() {
            "" => println!("[header] Sign in"),
            name => println!("[header] Hello, {name}"),
        }
    });

    // A balance badge that only cares about credits.
    let _badge = store.credits.watch(|credits| {
        println!("[badge] credits: {credits:?}");
    });

    let _audit = UserStore::get()?.subscribe(|session| {
        println!("[audit] session is now {session:?}");
    });

    println!("\nLogging in...");
    store.apply(SessionSnapshot {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        credits: "100".to_string(),
    });

    println!("\nUpdating email from another call site...");
    UserStore::get()?.email.set("a@x.com".to_string());

    println!("\nLogging out...");
    store.reset();

    println!("\nFinal state: {:#?}", store.snapshot());
    Ok(())
}
