//! End-to-end controller behavior against a scripted request port.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use listflow::{
    ListConfig, ListContext, ListError, ListRuntime, MemoryPersistence, PageResult,
    PaginationMode, PersistencePort, RefreshOptions, RequestFailure, RequestPort, SearchDebouncer,
    SortOrder,
};

/// Routes controller tracing through the test harness when `RUST_LOG` is
/// set. Idempotent across tests.
fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Request port that replays a scripted queue of responses and records
/// every context it was called with.
#[derive(Default)]
struct ScriptedPort {
    responses: Mutex<VecDeque<Result<PageResult, RequestFailure>>>,
    calls: Mutex<Vec<ListContext>>,
}

impl ScriptedPort {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, response: Result<PageResult, RequestFailure>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> Vec<ListContext> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RequestPort for ScriptedPort {
    async fn fetch_page(&self, ctx: &ListContext) -> Result<PageResult, RequestFailure> {
        self.calls.lock().unwrap().push(ctx.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(PageResult::default()))
    }
}

fn rec(id: u64, name: &str) -> listflow::Record {
    match json!({ "id": id, "name": name }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn page(ids: std::ops::RangeInclusive<u64>, count: u64) -> PageResult {
    let items = ids.map(|id| rec(id, &format!("row-{id}"))).collect();
    PageResult::new(items, count)
}

fn ids(items: &[listflow::Record]) -> Vec<u64> {
    items
        .iter()
        .filter_map(|item| item.get("id").and_then(Value::as_u64))
        .collect()
}

#[tokio::test]
async fn page_replace_publishes_only_the_last_response() {
    trace_init();
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=10, 95)));
    port.push(Ok(page(11..=20, 95)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime
        .mount(ListConfig::new("users").with_per_page(10))
        .await
        .unwrap();

    {
        let view = list.view();
        assert!(view.has_more);
        assert_eq!((view.from, view.to), (1, 10));
        assert_eq!(view.pages_count, 10);
    }

    list.set_page(2).await.unwrap();
    assert_eq!(ids(&list.state().items), (11..=20).collect::<Vec<_>>());
    assert_eq!(list.view().from, 11);
    assert_eq!(list.view().to, 20);
    assert_eq!(port.call_count(), 2);
}

#[tokio::test]
async fn load_more_appends_and_refresh_restarts_accumulation() {
    trace_init();
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=2, 5)));
    port.push(Ok(page(3..=4, 5)));
    port.push(Ok(page(1..=2, 5)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime
        .mount(
            ListConfig::new("feed")
                .with_per_page(2)
                .with_mode(PaginationMode::LoadMore),
        )
        .await
        .unwrap();
    assert_eq!(ids(&list.state().items), vec![1, 2]);

    list.load_more().await.unwrap();
    assert_eq!(ids(&list.state().items), vec![1, 2, 3, 4]);
    assert_eq!(list.state().page, Some(2));

    list.refresh(RefreshOptions::new()).await.unwrap();
    assert_eq!(list.state().page, Some(1));
    assert_eq!(ids(&list.state().items), vec![1, 2]);

    let calls = port.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].page, 2);
    assert_eq!(calls[2].page, 1);
    assert!(calls[2].is_refresh);
}

#[tokio::test]
async fn fetching_page_one_in_load_more_replaces_instead_of_appending() {
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=2, 4)));
    port.push(Ok(page(3..=4, 4)));
    port.push(Ok(page(1..=2, 4)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime
        .mount(
            ListConfig::new("feed")
                .with_per_page(2)
                .with_mode(PaginationMode::LoadMore),
        )
        .await
        .unwrap();

    list.load_more().await.unwrap();
    list.set_page(1).await.unwrap();
    assert_eq!(ids(&list.state().items), vec![1, 2]);
}

#[tokio::test]
async fn cleared_page_input_suppresses_the_fetch() {
    let port = ScriptedPort::new();
    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();
    assert_eq!(port.call_count(), 1);

    list.set_page(0).await.unwrap();
    assert_eq!(list.state().page, None);
    assert_eq!(port.call_count(), 1);
    assert!(list.view().page.is_none());

    list.set_page(3).await.unwrap();
    assert_eq!(list.state().page, Some(3));
    assert_eq!(port.call_count(), 2);
    assert_eq!(port.calls()[1].page, 3);
}

#[tokio::test]
async fn successful_fetch_resets_selection_and_error() {
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=3, 3)));
    port.push(Err(RequestFailure::new("boom")));
    port.push(Ok(page(1..=3, 3)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();

    list.set_selection([json!(1), json!(2), json!(1)]);
    assert_eq!(list.state().selection, vec![json!(1), json!(2)]);

    let err = list.set_page(2).await.unwrap_err();
    assert!(matches!(err, ListError::Request(_)));
    assert!(list.state().items.is_empty());
    assert_eq!(list.state().count, 0);
    assert_eq!(
        list.state().error.as_ref().map(|f| f.message.as_str()),
        Some("boom")
    );

    list.set_page(1).await.unwrap();
    assert!(list.state().selection.is_empty());
    assert!(list.state().error.is_none());
    assert_eq!(list.state().count, 3);
}

#[tokio::test]
async fn failed_initial_fetch_does_not_fail_the_mount() {
    let port = ScriptedPort::new();
    port.push(Err(RequestFailure::with_status("offline", 503)));

    let runtime = ListRuntime::new(port.clone());
    let list = runtime.mount(ListConfig::new("users")).await.unwrap();

    assert!(list.state().items.is_empty());
    assert_eq!(
        list.state().error.as_ref().and_then(|f| f.status),
        Some(503)
    );
    assert!(!list.state().is_initializing);
}

#[tokio::test]
async fn saved_state_overrides_configuration_defaults() {
    let port = ScriptedPort::new();
    let store = Arc::new(MemoryPersistence::new());

    // Simulate a previous session that left the list on page 3 with an
    // open-status filter.
    let mut previous = ListContext {
        endpoint: "tickets".into(),
        version: 1,
        list_id: None,
        meta: serde_json::Map::new(),
        page: 3,
        per_page: 25,
        search: String::new(),
        sort_by: String::new(),
        sort_order: SortOrder::Desc,
        filters: BTreeMap::new(),
        attr_settings: BTreeMap::new(),
        is_refresh: false,
        extra: serde_json::Map::new(),
    };
    previous.filters.insert("status".into(), json!("open"));
    store.set(&previous).unwrap();

    let runtime = ListRuntime::new(port.clone()).with_persistence(store);
    let list = runtime.mount(ListConfig::new("tickets")).await.unwrap();

    let calls = port.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].page, 3);
    assert_eq!(calls[0].filters.get("status"), Some(&json!("open")));
    assert_eq!(list.state().page, Some(3));
}

#[tokio::test(start_paused = true)]
async fn debounced_search_fetches_once_with_the_last_value() {
    let port = ScriptedPort::new();
    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();
    assert_eq!(port.call_count(), 1);

    let mut debouncer = SearchDebouncer::default();
    debouncer.input("a");
    debouncer.input("ad");
    debouncer.input("ada");

    let settled = debouncer.settled().await.unwrap();
    list.set_search(settled).await.unwrap();

    assert_eq!(port.call_count(), 2);
    assert_eq!(port.calls()[1].search, "ada");
    assert_eq!(port.calls()[1].page, 1);
}

#[tokio::test]
async fn unchanged_search_is_a_no_op() {
    let port = ScriptedPort::new();
    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();

    list.set_search("ada").await.unwrap();
    list.set_search("ada").await.unwrap();
    assert_eq!(port.call_count(), 2);
}

#[tokio::test]
async fn registry_refresh_reaches_the_mounted_list() {
    let port = ScriptedPort::new();
    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime
        .mount(ListConfig::new("users").with_list_id("users-main"))
        .await
        .unwrap();

    let registry = runtime.registry();
    let notified = registry.refresh_list(
        Some("users-main"),
        RefreshOptions::new().with("reason", json!("external-update")),
    );
    assert_eq!(notified, 1);

    let applied = list.apply_external_refresh().await.unwrap();
    assert_eq!(applied, 1);

    let calls = port.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].is_refresh);
    assert_eq!(calls[1].extra.get("reason"), Some(&json!("external-update")));

    list.on_unmount();
    assert_eq!(registry.refresh_list(Some("users-main"), RefreshOptions::new()), 0);
}

#[tokio::test]
async fn failed_refresh_keeps_later_requests_queued() {
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=2, 2)));
    port.push(Err(RequestFailure::new("transient")));
    port.push(Ok(page(1..=2, 2)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime
        .mount(ListConfig::new("users").with_list_id("users-main"))
        .await
        .unwrap();

    let registry = runtime.registry();
    registry.refresh_list(Some("users-main"), RefreshOptions::new());
    registry.refresh_list(
        Some("users-main"),
        RefreshOptions::new().with("attempt", json!(2)),
    );

    let err = list.apply_external_refresh().await.unwrap_err();
    assert!(matches!(err, ListError::Request(_)));

    // The second request survived the failure and applies on the next
    // drain.
    assert_eq!(list.apply_external_refresh().await.unwrap(), 1);
    let calls = port.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].extra.get("attempt"), Some(&json!(2)));
    assert!(list.state().error.is_none());
}

#[tokio::test]
async fn no_op_mutations_leave_the_view_version_alone() {
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=2, 2)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();

    let baseline = list.view().version;
    let patch = rec(99, "ghost");
    list.update_item_by_id(&patch, &json!(99));
    assert_eq!(list.view().version, baseline);

    list.set_page(0).await.unwrap();
    let cleared = list.view().version;
    assert_ne!(cleared, baseline);

    list.set_page(0).await.unwrap();
    assert_eq!(list.view().version, cleared);
}

#[tokio::test]
async fn config_change_refetches_only_when_the_query_changed() {
    let port = ScriptedPort::new();
    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();

    // Attribute-only change: settings get seeded, no fetch runs.
    let attrs_only = ListConfig::new("users").with_attrs(["name", "email"]);
    assert!(!list.on_config_change(attrs_only).await.unwrap());
    assert_eq!(port.call_count(), 1);
    assert!(list.state().attr_settings["email"].visible);

    let mut filtered = ListConfig::new("users").with_attrs(["name", "email"]);
    filtered.filters.insert("role".into(), json!("admin"));
    assert!(list.on_config_change(filtered).await.unwrap());
    assert_eq!(port.call_count(), 2);
    assert_eq!(port.calls()[1].filters.get("role"), Some(&json!("admin")));
    assert_eq!(port.calls()[1].page, 1);
}

#[tokio::test]
async fn identical_config_is_a_no_op() {
    let port = ScriptedPort::new();
    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();

    assert!(!list.on_config_change(ListConfig::new("users")).await.unwrap());
    assert_eq!(port.call_count(), 1);
}

#[tokio::test]
async fn view_is_memoized_per_state_version() {
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=3, 3)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();

    let first = list.view().version;
    assert_eq!(list.view().version, first);

    list.set_selection([json!(2)]);
    let second = list.view().version;
    assert_ne!(first, second);
    assert_eq!(list.view().selection, vec![json!(2)]);
}

#[tokio::test]
async fn item_patching_updates_in_place_without_refetch() {
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=3, 3)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime.mount(ListConfig::new("users")).await.unwrap();

    let patch = rec(2, "renamed");
    list.update_item_by_id(&patch, &json!(2));

    assert_eq!(port.call_count(), 1);
    let renamed = &list.state().items[1];
    assert_eq!(renamed.get("name"), Some(&json!("renamed")));
    assert_eq!(list.state().items[0].get("name"), Some(&json!("row-1")));
}

#[tokio::test]
async fn attr_visibility_flows_into_the_view() {
    let port = ScriptedPort::new();
    port.push(Ok(page(1..=1, 1)));

    let runtime = ListRuntime::new(port.clone());
    let mut list = runtime
        .mount(ListConfig::new("users").with_attrs(["id", "name"]))
        .await
        .unwrap();

    assert!(list.view().attrs.iter().all(|a| a.visible));

    list.update_attr("name", "visible", json!(false));
    let hidden = list
        .view()
        .attrs
        .iter()
        .find(|a| a.name == "name")
        .unwrap();
    assert!(!hidden.visible);
}
