//! End-to-end runs of the guarded pipeline over in-memory collaborators.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use tempfile::TempDir;

use gotosync_core::{Contact, CoreError, ProductCategory, ProductChoice, ProductChoices, RemoteApi};
use gotosync_sync::{
    pipeline, EventStore, ProgressLine, ProgressSink, RunLock, RunOutcome, RunRequest,
    StoreModel, SyncError, SyncModel, SyncOptions,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeApi {
    authorized: BTreeSet<ProductCategory>,
    catalogs: BTreeMap<ProductCategory, Vec<(String, ProductChoice)>>,
    registrants: BTreeMap<String, Vec<Contact>>,
    catalog_fetches: RefCell<Vec<ProductCategory>>,
}

impl FakeApi {
    fn authorize(mut self, category: ProductCategory) -> Self {
        self.authorized.insert(category);
        self
    }

    fn catalog(mut self, category: ProductCategory, items: &[(&str, &str)]) -> Self {
        let entries = items
            .iter()
            .map(|(id, subject)| {
                let serde_json::Value::Object(map) = json!({"subject": subject}) else {
                    unreachable!()
                };
                (id.to_string(), ProductChoice::from(map))
            })
            .collect();
        self.catalogs.insert(category, entries);
        self
    }

    fn registrants(mut self, id: &str, emails: &[&str]) -> Self {
        self.registrants
            .insert(id.to_string(), emails.iter().map(|e| Contact::new(*e)).collect());
        self
    }
}

impl RemoteApi for FakeApi {
    fn is_authorized(&self, category: ProductCategory) -> bool {
        self.authorized.contains(&category)
    }

    fn fetch_choices(&self, category: ProductCategory) -> Result<ProductChoices, CoreError> {
        self.catalog_fetches.borrow_mut().push(category);
        Ok(self
            .catalogs
            .get(&category)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect())
    }

    fn fetch_registrants(&self, _: ProductCategory, id: &str) -> Result<Vec<Contact>, CoreError> {
        self.registrants
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::Remote(format!("HTTP 500 for {id}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Product(ProductCategory, String),
    Delete(ProductCategory, Vec<String>),
    Event(ProductCategory, String, String),
}

#[derive(Default)]
struct RecordingModel {
    calls: Vec<Call>,
    fail_events: BTreeSet<String>,
    fail_products: BTreeSet<String>,
}

impl RecordingModel {
    fn failing_event(id: &str) -> Self {
        Self {
            fail_events: [id.to_string()].into(),
            ..Self::default()
        }
    }

    fn event_ids(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Event(_, id, _) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SyncModel for RecordingModel {
    fn sync_product(
        &mut self,
        category: ProductCategory,
        id: &str,
        _choice: &ProductChoice,
        _sink: &mut dyn ProgressSink,
    ) -> Result<(), SyncError> {
        self.calls.push(Call::Product(category, id.to_string()));
        if self.fail_products.contains(id) {
            return Err(SyncError::Core(CoreError::Remote("metadata write failed".into())));
        }
        Ok(())
    }

    fn delete_removed_products(
        &mut self,
        category: ProductCategory,
        ids: &[String],
    ) -> Result<usize, SyncError> {
        self.calls.push(Call::Delete(category, ids.to_vec()));
        Ok(0)
    }

    fn sync_event(
        &mut self,
        category: ProductCategory,
        id: &str,
        event_name: &str,
        _event_description: &str,
        _sink: &mut dyn ProgressSink,
    ) -> Result<usize, SyncError> {
        self.calls
            .push(Call::Event(category, id.to_string(), event_name.to_string()));
        if self.fail_events.contains(id) {
            return Err(SyncError::Core(CoreError::Remote(format!("boom on {id}"))));
        }
        Ok(2)
    }
}

fn request(product: Option<&str>, options: SyncOptions) -> RunRequest {
    RunRequest {
        product: product.map(str::to_string),
        options,
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn lock_is_free(home: &TempDir, key: &str) -> bool {
    RunLock::acquire_at(home.path(), key)
        .expect("acquire")
        .is_some()
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[test]
fn failing_item_does_not_stop_its_neighbours() {
    init_logging();
    let home = TempDir::new().unwrap();
    let api = FakeApi::default().catalog(
        ProductCategory::Webinar,
        &[("A", "Alpha"), ("X", "Broken"), ("B", "Beta")],
    );
    let mut model = RecordingModel::failing_event("X");
    let mut lines: Vec<ProgressLine> = vec![];

    let outcome = pipeline::run(
        home.path(),
        &request(Some("webinar"), SyncOptions::default()),
        &api,
        &mut model,
        &mut lines,
    )
    .expect("run");

    assert_eq!(model.event_ids(), vec!["A", "X", "B"]);
    let RunOutcome::Completed(counters) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(counters.contacts, 4);
    assert_eq!(counters.failed, 1);
    assert_eq!(counters.events, 3);

    assert!(lines.contains(&ProgressLine::Error("Error syncing webinar: X.".into())));
    assert!(lines
        .iter()
        .any(|l| matches!(l, ProgressLine::Error(msg) if msg.contains("boom on X"))));
    assert!(!lines.iter().any(|l| matches!(l, ProgressLine::Detail(_))));
    assert_eq!(lines.last(), Some(&ProgressLine::Done));
    assert!(lines.contains(&ProgressLine::Summary("4 contacts synchronized.".into())));

    assert!(lock_is_free(&home, "webinar"), "lock must be released");
}

#[test]
fn verbose_errors_add_detail_lines() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default().catalog(ProductCategory::Meeting, &[("X", "Broken")]);
    let mut model = RecordingModel::failing_event("X");
    let mut lines: Vec<ProgressLine> = vec![];

    pipeline::run(
        home.path(),
        &request(
            Some("meeting"),
            SyncOptions {
                verbose_errors: true,
                ..SyncOptions::default()
            },
        ),
        &api,
        &mut model,
        &mut lines,
    )
    .expect("run");

    assert!(lines
        .iter()
        .any(|l| matches!(l, ProgressLine::Detail(detail) if detail.contains("Remote"))));
}

#[test]
fn metadata_failure_aborts_the_run_and_releases_the_lock() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default().catalog(ProductCategory::Training, &[("t1", "One"), ("t2", "Two")]);
    let mut model = RecordingModel {
        fail_products: ["t1".to_string()].into(),
        ..RecordingModel::default()
    };

    let err = pipeline::run(
        home.path(),
        &request(Some("training"), SyncOptions::default()),
        &api,
        &mut model,
        &mut (),
    )
    .unwrap_err();

    assert!(err.to_string().contains("metadata write failed"));
    assert_eq!(
        model.calls,
        vec![Call::Product(ProductCategory::Training, "t1".into())]
    );
    assert!(lock_is_free(&home, "training"));
}

// ---------------------------------------------------------------------------
// Selection and moderation
// ---------------------------------------------------------------------------

#[test]
fn exclude_events_goes_straight_to_contacts() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default().catalog(
        ProductCategory::Webinar,
        &[("100", "Product Launch"), ("200", "Q&A Session")],
    );
    let mut model = RecordingModel::default();

    pipeline::run(
        home.path(),
        &request(
            Some("webinar"),
            SyncOptions {
                exclude_events: true,
                ..SyncOptions::default()
            },
        ),
        &api,
        &mut model,
        &mut (),
    )
    .expect("run");

    assert_eq!(
        model.calls,
        vec![
            Call::Event(
                ProductCategory::Webinar,
                "100".into(),
                "product-launch_#100".into()
            ),
            Call::Event(
                ProductCategory::Webinar,
                "200".into(),
                "q-a-session_#200".into()
            ),
        ]
    );
}

#[test]
fn exclude_contacts_only_persists_metadata() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default().catalog(ProductCategory::Assist, &[("s1", "Remote help")]);
    let mut model = RecordingModel::default();

    pipeline::run(
        home.path(),
        &request(
            Some("assist"),
            SyncOptions {
                exclude_contacts: true,
                ..SyncOptions::default()
            },
        ),
        &api,
        &mut model,
        &mut (),
    )
    .expect("run");

    assert_eq!(
        model.calls,
        vec![
            Call::Product(ProductCategory::Assist, "s1".into()),
            Call::Delete(ProductCategory::Assist, vec!["s1".into()]),
        ]
    );
}

#[test]
fn held_lock_means_no_work_at_all() {
    let home = TempDir::new().unwrap();
    let _first_run = RunLock::acquire_at(home.path(), "webinar").unwrap().unwrap();
    let api = FakeApi::default()
        .authorize(ProductCategory::Webinar)
        .catalog(ProductCategory::Webinar, &[("A", "Alpha")]);
    let mut model = RecordingModel::default();
    let mut lines: Vec<ProgressLine> = vec![];

    let outcome = pipeline::run(
        home.path(),
        &request(Some("webinar"), SyncOptions::default()),
        &api,
        &mut model,
        &mut lines,
    )
    .expect("run");

    assert_eq!(outcome, RunOutcome::Skipped);
    assert!(model.calls.is_empty());
    assert!(api.catalog_fetches.borrow().is_empty());
    assert!(lines.is_empty());
    assert!(!lock_is_free(&home, "webinar"), "the first run's lock must survive");
}

#[test]
fn no_authorized_products_is_a_clean_no_op() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default().catalog(ProductCategory::Webinar, &[("A", "Alpha")]);
    let mut model = RecordingModel::default();

    let outcome = pipeline::run(
        home.path(),
        &RunRequest::default(),
        &api,
        &mut model,
        &mut (),
    )
    .expect("run");

    assert_eq!(outcome, RunOutcome::NoProducts);
    assert!(model.calls.is_empty());
    assert!(lock_is_free(&home, ""));
}

#[test]
fn invalid_product_reports_and_releases() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default().authorize(ProductCategory::Webinar);
    let mut model = RecordingModel::default();
    let mut lines: Vec<ProgressLine> = vec![];

    let err = pipeline::run(
        home.path(),
        &request(Some("podcast"), SyncOptions::default()),
        &api,
        &mut model,
        &mut lines,
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::InvalidProduct(ref p) if p == "podcast"));
    assert_eq!(
        lines,
        vec![ProgressLine::Error("Invalid product: podcast. Aborted".into())]
    );
    assert!(model.calls.is_empty());
    assert!(lock_is_free(&home, "podcast"));
}

#[test]
fn all_products_run_in_declaration_order() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default()
        .authorize(ProductCategory::Assist)
        .authorize(ProductCategory::Meeting)
        .catalog(ProductCategory::Meeting, &[("m1", "Standup")])
        .catalog(ProductCategory::Assist, &[("s1", "Support")])
        .catalog(ProductCategory::Webinar, &[("w1", "Never")]);
    let mut model = RecordingModel::default();
    let mut lines: Vec<ProgressLine> = vec![];

    pipeline::run(
        home.path(),
        &RunRequest::default(),
        &api,
        &mut model,
        &mut lines,
    )
    .expect("run");

    assert_eq!(
        *api.catalog_fetches.borrow(),
        vec![ProductCategory::Meeting, ProductCategory::Assist]
    );
    let headings: Vec<_> = lines
        .iter()
        .filter_map(|l| match l {
            ProgressLine::Heading(h) => Some(h.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        headings,
        vec![
            "Synchronizing registrants for GoToMeeting",
            "Synchronizing registrants for GoToAssist",
        ]
    );
}

#[test]
fn explicit_id_skips_the_catalog() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default().catalog(ProductCategory::Webinar, &[("other", "Other")]);
    let mut model = RecordingModel::default();

    pipeline::run(
        home.path(),
        &request(
            Some("webinar"),
            SyncOptions {
                id: Some("555".into()),
                ..SyncOptions::default()
            },
        ),
        &api,
        &mut model,
        &mut (),
    )
    .expect("run");

    assert!(api.catalog_fetches.borrow().is_empty());
    assert_eq!(
        model.calls,
        vec![
            Call::Product(ProductCategory::Webinar, "555".into()),
            Call::Delete(ProductCategory::Webinar, vec!["555".into()]),
            Call::Event(ProductCategory::Webinar, "555".into(), "555_#555".into()),
        ]
    );
}

// ---------------------------------------------------------------------------
// Store-backed model
// ---------------------------------------------------------------------------

#[test]
fn store_model_persists_events_and_contacts() {
    init_logging();
    let home = TempDir::new().unwrap();
    let api = FakeApi::default()
        .catalog(
            ProductCategory::Webinar,
            &[("w1", "Launch"), ("w2", "Broken"), ("w3", "Wrap-up")],
        )
        .registrants("w1", &["ada@example.com", "grace@example.com"])
        .registrants("w3", &["alan@example.com"]);

    let mut store = EventStore::open_at(home.path()).unwrap();
    store.upsert_event(ProductCategory::Webinar, "gone", "Cancelled");
    store.save().unwrap();

    let mut model = StoreModel::new(&api, home.path());
    let outcome = pipeline::run(
        home.path(),
        &request(Some("webinar"), SyncOptions::default()),
        &api,
        &mut model,
        &mut (),
    )
    .expect("run");

    let RunOutcome::Completed(counters) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(counters.contacts, 3);
    assert_eq!(counters.failed, 1);
    assert_eq!(counters.removed, 1);

    let stored = EventStore::open_at(home.path()).unwrap();
    assert!(stored.get(ProductCategory::Webinar, "gone").is_none());
    let w1 = stored.get(ProductCategory::Webinar, "w1").unwrap();
    assert_eq!(w1.title, "Launch");
    assert_eq!(w1.event_name.as_deref(), Some("launch_#w1"));
    assert_eq!(w1.contacts.len(), 2);
    let w2 = stored.get(ProductCategory::Webinar, "w2").unwrap();
    assert_eq!(w2.title, "Broken");
    assert!(w2.contacts.is_empty());
    assert!(w2.event_name.is_none(), "a failed registrant fetch must not stamp the event");
    assert_eq!(stored.events(ProductCategory::Webinar).count(), 3);
}

fn run_with(home: &TempDir, model: &mut StoreModel<'_>, api: &FakeApi, req: RunRequest) -> RunOutcome {
    pipeline::run(home.path(), &req, api, model, &mut ()).expect("run")
}

#[test]
fn store_models_with_different_run_keys_share_one_home() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default()
        .catalog(ProductCategory::Webinar, &[("w1", "Launch")])
        .catalog(ProductCategory::Meeting, &[("m1", "Standup")])
        .registrants("w1", &["ada@example.com"])
        .registrants("m1", &["grace@example.com"]);
    let mut webinar_model = StoreModel::new(&api, home.path());
    let mut meeting_model = StoreModel::new(&api, home.path());

    run_with(&home, &mut webinar_model, &api, request(Some("webinar"), SyncOptions::default()));
    run_with(&home, &mut meeting_model, &api, request(Some("meeting"), SyncOptions::default()));
    // The webinar model still holds the snapshot it read before the meeting run.
    run_with(
        &home,
        &mut webinar_model,
        &api,
        request(
            Some("webinar"),
            SyncOptions {
                exclude_events: true,
                ..SyncOptions::default()
            },
        ),
    );

    let stored = EventStore::open_at(home.path()).unwrap();
    let webinar = stored.get(ProductCategory::Webinar, "w1").expect("webinar kept");
    assert!(webinar.contacts.contains_key("ada@example.com"));
    let meeting = stored.get(ProductCategory::Meeting, "m1").expect("meeting kept");
    assert!(meeting.contacts.contains_key("grace@example.com"));
}

#[test]
fn resync_by_id_keeps_the_stored_title() {
    let home = TempDir::new().unwrap();
    let api = FakeApi::default()
        .catalog(ProductCategory::Webinar, &[("w1", "Launch")])
        .registrants("w1", &["ada@example.com", "ADA@example.com", "alan@example.com"]);

    run_with(
        &home,
        &mut StoreModel::new(&api, home.path()),
        &api,
        request(Some("webinar"), SyncOptions::default()),
    );
    let outcome = run_with(
        &home,
        &mut StoreModel::new(&api, home.path()),
        &api,
        request(
            Some("webinar"),
            SyncOptions {
                id: Some("w1".into()),
                ..SyncOptions::default()
            },
        ),
    );

    let RunOutcome::Completed(counters) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(counters.contacts, 2, "duplicate emails count once");
    let stored = EventStore::open_at(home.path()).unwrap();
    let w1 = stored.get(ProductCategory::Webinar, "w1").unwrap();
    assert_eq!(w1.title, "Launch");
    assert_eq!(w1.contacts.len(), 2);
}

#[test]
fn store_is_not_created_when_the_run_is_skipped() {
    let home = TempDir::new().unwrap();
    let _running = RunLock::acquire_at(home.path(), "webinar").unwrap().unwrap();
    let api = FakeApi::default().catalog(ProductCategory::Webinar, &[("w1", "Launch")]);

    let outcome = run_with(
        &home,
        &mut StoreModel::new(&api, home.path()),
        &api,
        request(Some("webinar"), SyncOptions::default()),
    );

    assert_eq!(outcome, RunOutcome::Skipped);
    assert!(!gotosync_sync::store::store_path_at(home.path()).exists());
}
