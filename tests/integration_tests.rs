//! Integration tests for the session store

use serial_test::serial;
use session_signals::runtime::ReactiveRuntime;
use session_signals::{
    create_effect, use_store, Effect, SessionSnapshot, Signal, Store, StoreError, UserStore,
    USER_STORE_ID,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

fn counting_effect(signal: &Signal<String>) -> (Effect, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let effect = create_effect({
        let signal = signal.clone();
        let counter = Arc::clone(&counter);
        move || {
            let _ = signal.get();
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    (effect, counter)
}

#[test]
fn fresh_store_has_empty_fields() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        assert_eq!(store.username.get(), "");
        assert_eq!(store.email.get(), "");
        assert_eq!(store.credits.get(), "");
    });
}

#[test]
fn write_username_leaves_email() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        store.username.set("alice".to_string());

        assert_eq!(store.username.get(), "alice");
        assert_eq!(store.email.get(), "");
        assert_eq!(store.credits.get(), "");
    });
}

#[test]
fn two_call_sites_share_one_store() {
    ReactiveRuntime::scope(|| {
        let first = UserStore::get().unwrap();
        let second = UserStore::get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        first.email.set("a@x.com".to_string());
        assert_eq!(second.email.get(), "a@x.com");
    });
}

#[test]
fn credits_last_write_wins() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        store.credits.set("100".to_string());
        store.credits.set("150".to_string());
        assert_eq!(store.credits.get(), "150");
    });
}

#[test]
fn singleton_across_many_resolutions() {
    ReactiveRuntime::scope(|| {
        let first = UserStore::get().unwrap();
        for _ in 0..16 {
            let again = use_store::<UserStore>().unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(ReactiveRuntime::current().registry().len(), 1);
    });
}

#[test]
fn observers_only_see_their_field() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        let (_username_effect, username_runs) = counting_effect(&store.username);
        let (_email_effect, email_runs) = counting_effect(&store.email);

        // Both run once on creation.
        assert_eq!(username_runs.load(Ordering::SeqCst), 1);
        assert_eq!(email_runs.load(Ordering::SeqCst), 1);

        store.username.set("alice".to_string());
        assert_eq!(username_runs.load(Ordering::SeqCst), 2);
        assert_eq!(email_runs.load(Ordering::SeqCst), 1);

        store.credits.set("100".to_string());
        assert_eq!(username_runs.load(Ordering::SeqCst), 2);
        assert_eq!(email_runs.load(Ordering::SeqCst), 1);

        store.email.set("a@x.com".to_string());
        assert_eq!(username_runs.load(Ordering::SeqCst), 2);
        assert_eq!(email_runs.load(Ordering::SeqCst), 2);
    });
}

#[test]
fn every_write_notifies() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        let (_effect, runs) = counting_effect(&store.credits);

        store.credits.set("100".to_string());
        store.credits.set("100".to_string());
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    });
}

#[test]
fn fields_are_independent() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        store.apply(SessionSnapshot {
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            credits: "100".to_string(),
        });

        store.email.set("b@y.com".to_string());
        assert_eq!(
            store.snapshot(),
            SessionSnapshot {
                username: "alice".to_string(),
                email: "b@y.com".to_string(),
                credits: "100".to_string(),
            }
        );
    });
}

#[test]
fn runtimes_do_not_share_stores() {
    let a = ReactiveRuntime::new();
    let b = ReactiveRuntime::new();

    ReactiveRuntime::with_runtime(a.clone(), || {
        UserStore::get().unwrap().username.set("alice".to_string());
    });
    ReactiveRuntime::with_runtime(b, || {
        assert_eq!(UserStore::get().unwrap().username.get(), "");
    });
    ReactiveRuntime::with_runtime(a, || {
        assert_eq!(UserStore::get().unwrap().username.get(), "alice");
    });
}

#[test]
fn clear_tears_down_the_store() {
    let runtime = ReactiveRuntime::new();
    ReactiveRuntime::with_runtime(runtime.clone(), || {
        let before = UserStore::get().unwrap();
        before.username.set("alice".to_string());

        runtime.clear();
        assert!(!runtime.registry().contains(USER_STORE_ID));

        let after = UserStore::get().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.username.get(), "");
    });
}

#[test]
fn key_conflict_is_reported() {
    #[derive(Debug)]
    struct Imposter;

    impl Store for Imposter {
        const ID: &'static str = USER_STORE_ID;

        fn setup() -> Self {
            Imposter
        }
    }

    ReactiveRuntime::scope(|| {
        UserStore::get().unwrap();
        let err = use_store::<Imposter>().unwrap_err();
        assert!(matches!(err, StoreError::KeyConflict { id: "user", .. }));
    });
}

#[test]
fn snapshot_round_trips_through_json() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        let payload = r#"{"username":"alice","email":"a@x.com"}"#;
        let snapshot: SessionSnapshot = serde_json::from_str(payload).unwrap();
        assert_eq!(snapshot.credits, "");

        store.apply(snapshot);
        let json = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"username": "alice", "email": "a@x.com", "credits": ""})
        );
    });
}

#[test]
#[serial]
fn global_runtime_holds_one_store() {
    let global = ReactiveRuntime::global();
    global.clear();

    let first = UserStore::get().unwrap();
    let second = use_store::<UserStore>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(global.registry().contains(USER_STORE_ID));

    global.clear();
}

#[test]
fn effect_follows_its_current_reads() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        let show_name = Signal::new(true);
        let runs = Arc::new(AtomicUsize::new(0));

        let _header = create_effect({
            let show_name = show_name.clone();
            let username = store.username.clone();
            let runs = Arc::clone(&runs);
            move || {
                if show_name.get() {
                    let _ = username.get();
                }
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.username.set("alice".to_string());
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // Stops reading `username`, so stops hearing about it.
        show_name.set(false);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        store.username.set("bob".to_string());
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        // Reads it again, so hears about it again.
        show_name.set(true);
        assert_eq!(runs.load(Ordering::SeqCst), 4);
        store.username.set("carol".to_string());
        assert_eq!(runs.load(Ordering::SeqCst), 5);
    });
}

#[test]
fn callbacks_stay_scoped_to_their_field() {
    ReactiveRuntime::scope(|| {
        let store = UserStore::get().unwrap();
        let watch_calls = Arc::new(AtomicUsize::new(0));
        let subscribe_calls = Arc::new(AtomicUsize::new(0));
        let theme = Signal::new("light".to_string());

        let _guard = store.username.watch({
            let email = store.email.clone();
            let watch_calls = Arc::clone(&watch_calls);
            move |_| {
                let _ = email.get();
                watch_calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        let _subscription = store.subscribe({
            let theme = theme.clone();
            let subscribe_calls = Arc::clone(&subscribe_calls);
            move |_| {
                let _ = theme.get();
                subscribe_calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(watch_calls.load(Ordering::SeqCst), 1);

        store.email.set("a@x.com".to_string());
        assert_eq!(watch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(subscribe_calls.load(Ordering::SeqCst), 1);

        theme.set("dark".to_string());
        assert_eq!(subscribe_calls.load(Ordering::SeqCst), 1);

        store.username.set("alice".to_string());
        assert_eq!(watch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(subscribe_calls.load(Ordering::SeqCst), 2);
    });
}

#[test]
fn registry_resolution_outside_the_runtime_binds_to_it() {
    let runtime = ReactiveRuntime::new();
    let store = runtime.registry().resolve::<UserStore>().unwrap();

    ReactiveRuntime::with_runtime(Arc::clone(&runtime), || {
        assert!(Arc::ptr_eq(&store, &UserStore::get().unwrap()));

        let (_effect, runs) = counting_effect(&store.username);
        store.username.set("alice".to_string());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    });
}
