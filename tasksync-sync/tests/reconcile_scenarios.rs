use rstest::rstest;
use serde_json::json;

use tasksync_core::config::{CollectionRef, PairConfig};
use tasksync_core::types::{
    Collection, CollectionId, Comment, FieldMap, Item, ItemId, ItemSummary, Membership,
    MembershipPolicy, MissingSectionPolicy, Placement, ReconcileMode, Section, SyncField,
    Workspace, WorkspaceId,
};
use tasksync_sync::{
    resolve_endpoint, run_pair, ItemStatus, MemoryStore, Mutation, PairOverrides, PassReport,
    ReconcileOptions, Reconciler, ResolvedEndpoint, StoreError, SyncError, TaskStore,
};

struct Fixture {
    store: MemoryStore,
    a: CollectionId,
    b: CollectionId,
}

impl Fixture {
    fn new(sections_a: &[&str], sections_b: &[&str]) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut store = MemoryStore::new();
        let acme = store.add_workspace("Acme");
        let partners = store.add_workspace("Acme Partners");
        let a = store.add_collection(&acme, "Roadmap");
        let b = store.add_collection(&partners, "Roadmap");
        for name in sections_a {
            store.add_section(&a, name);
        }
        for name in sections_b {
            store.add_section(&b, name);
        }
        Self { store, a, b }
    }

    fn seed(
        &mut self,
        side: Side,
        name: &str,
        notes: Option<&str>,
        sections: &[&str],
        comments: Vec<Comment>,
    ) -> ItemId {
        let collection = match side {
            Side::A => self.a.clone(),
            Side::B => self.b.clone(),
        };
        let mut fields = serde_json::Map::new();
        if let Some(notes) = notes {
            fields.insert("notes".to_string(), json!(notes));
        }
        let memberships = sections
            .iter()
            .map(|section| Membership {
                collection: collection.clone(),
                section: self
                    .store
                    .section_id(&collection, section)
                    .expect("fixture section"),
                section_name: section.to_string(),
            })
            .collect();
        let id = ItemId::from(self.store.fresh_id("t"));
        self.store.insert_item(
            &collection,
            Item {
                id: id.clone(),
                name: name.to_string(),
                fields,
                memberships,
                comments,
            },
        );
        id
    }

    fn endpoints(&self) -> (ResolvedEndpoint, ResolvedEndpoint) {
        let a = resolve_endpoint(&self.store, &CollectionRef::new("Acme", "Roadmap"))
            .expect("resolve a");
        let b = resolve_endpoint(&self.store, &CollectionRef::new("Acme Partners", "Roadmap"))
            .expect("resolve b");
        (a, b)
    }

    /// One A → B pass.
    fn pass(&mut self, options: ReconcileOptions) -> Result<PassReport, SyncError> {
        let (a, b) = self.endpoints();
        Reconciler::new(&mut self.store, options).run(&a, &b)
    }

    fn placement(&self, side: Side, section: &str) -> Placement {
        let collection = match side {
            Side::A => self.a.clone(),
            Side::B => self.b.clone(),
        };
        Placement {
            section: self
                .store
                .section_id(&collection, section)
                .expect("fixture section"),
            collection,
        }
    }

    fn mutations(&self) -> Vec<Mutation> {
        self.store
            .journal()
            .iter()
            .map(|entry| entry.mutation.clone())
            .collect()
    }
}

#[derive(Clone, Copy)]
enum Side {
    A,
    B,
}

fn pair() -> PairConfig {
    PairConfig::new(
        CollectionRef::new("Acme", "Roadmap"),
        CollectionRef::new("Acme Partners", "Roadmap"),
    )
}

fn fields(entries: &[(SyncField, serde_json::Value)]) -> FieldMap {
    entries.iter().cloned().collect()
}

// ---------------------------------------------------------------------------
// Core scenarios
// ---------------------------------------------------------------------------

#[test]
fn missing_item_is_created_with_memberships_then_comments() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Backlog"], vec![Comment::human("LGTM")]);

    let report = fx.pass(ReconcileOptions::default()).expect("pass");

    assert_eq!(report.created(), 1);
    assert_eq!(
        fx.mutations(),
        vec![
            Mutation::CreateItem {
                fields: fields(&[
                    (SyncField::Name, json!("Design doc")),
                    (SyncField::Notes, json!("v1")),
                ]),
                placements: vec![fx.placement(Side::B, "Backlog")],
            },
            Mutation::AddComment {
                text: "LGTM".to_string()
            },
        ]
    );
    // The comment lands on the created item.
    let journal = fx.store.journal();
    assert_eq!(journal[0].item, journal[1].item);
}

#[test]
fn matched_item_gets_only_the_changed_field_and_missing_comment() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Backlog"], vec![Comment::human("LGTM")]);
    let dest = fx.seed(Side::B, "Design doc", Some("v0"), &["Backlog"], vec![]);

    let report = fx.pass(ReconcileOptions::default()).expect("pass");

    assert_eq!(report.reconciled(), 1);
    assert_eq!(
        fx.mutations(),
        vec![
            Mutation::UpdateItem {
                fields: fields(&[(SyncField::Notes, json!("v1"))]),
            },
            Mutation::AddComment {
                text: "LGTM".to_string()
            },
        ]
    );
    assert!(fx.store.journal().iter().all(|entry| entry.item == dest));
}

#[test]
fn comment_already_on_destination_is_not_resent() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Backlog"], vec![Comment::human("LGTM")]);
    fx.seed(Side::B, "Design doc", Some("v1"), &["Backlog"], vec![Comment::human("LGTM")]);

    let report = fx.pass(ReconcileOptions::default()).expect("pass");

    assert_eq!(report.mutation_count(), 0);
    assert_eq!(report.unchanged(), 1);
    assert!(fx.store.journal().is_empty());
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn second_pass_is_a_no_op() {
    let mut fx = Fixture::new(&["Backlog", "Doing"], &["Backlog", "Doing"]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Backlog"], vec![Comment::human("LGTM")]);
    fx.seed(Side::A, "Launch plan", None, &["Doing"], vec![]);
    fx.seed(Side::B, "Launch plan", Some("dest notes"), &[], vec![]);

    fx.pass(ReconcileOptions::default()).expect("first pass");
    fx.store.take_journal();
    let again = fx.pass(ReconcileOptions::default()).expect("second pass");

    assert_eq!(again.mutation_count(), 0);
    assert!(fx.store.journal().is_empty());
}

#[test]
fn bidirectional_pair_converges_and_stays_quiet() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "From A", Some("a"), &["Backlog"], vec![Comment::human("hello")]);
    fx.seed(Side::B, "From B", Some("b"), &["Backlog"], vec![]);

    let first = run_pair(&mut fx.store, &pair(), PairOverrides::default()).expect("first");
    assert_eq!(first.passes.len(), 2);
    assert_eq!(first.passes[0].created(), 1);
    assert_eq!(first.passes[1].created(), 1);

    fx.store.take_journal();
    let second = run_pair(&mut fx.store, &pair(), PairOverrides::default()).expect("second");
    assert_eq!(second.mutation_count(), 0);
}

#[test]
fn same_named_source_items_each_get_their_own_copy() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "Standup", Some("mon"), &["Backlog"], vec![]);
    fx.seed(Side::A, "Standup", Some("tue"), &["Backlog"], vec![]);

    let first = fx.pass(ReconcileOptions::default()).expect("first pass");
    assert_eq!(first.created(), 2);
    let journal = fx.store.take_journal();
    assert_ne!(journal[0].item, journal[1].item);

    for _ in 0..2 {
        let again = fx.pass(ReconcileOptions::default()).expect("later pass");
        assert_eq!(again.reconciled(), 2);
        assert_eq!(again.mutation_count(), 0);
        assert!(fx.store.journal().is_empty());
    }
}

#[test]
fn a_destination_item_is_claimed_by_one_source_item() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "Standup", None, &["Backlog"], vec![Comment::human("LGTM")]);
    fx.seed(Side::A, "Standup", None, &["Backlog"], vec![Comment::human("LGTM")]);
    let dest = fx.seed(Side::B, "Standup", None, &["Backlog"], vec![]);

    let report = fx.pass(ReconcileOptions::default()).expect("pass");

    assert_eq!(report.reconciled(), 1);
    assert_eq!(report.created(), 1);
    assert_eq!(report.outcomes[0].item, Some(dest.clone()));
    let comments_on_dest = fx
        .store
        .journal()
        .iter()
        .filter(|entry| entry.item == dest)
        .filter(|entry| matches!(entry.mutation, Mutation::AddComment { .. }))
        .count();
    assert_eq!(comments_on_dest, 1);
    let ops: Vec<_> = report.outcomes[1].mutations.iter().map(Mutation::op).collect();
    assert_eq!(ops, vec!["create", "add-comment"]);
}

/// Delegates to a `MemoryStore` but fails the next `add_comment` calls.
struct FlakyComments {
    inner: MemoryStore,
    failures: usize,
}

impl TaskStore for FlakyComments {
    fn list_workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        self.inner.list_workspaces()
    }

    fn list_collections(&self, workspace: &WorkspaceId) -> Result<Vec<Collection>, StoreError> {
        self.inner.list_collections(workspace)
    }

    fn list_sections(&self, collection: &CollectionId) -> Result<Vec<Section>, StoreError> {
        self.inner.list_sections(collection)
    }

    fn list_items(&self, collection: &CollectionId) -> Result<Vec<ItemSummary>, StoreError> {
        self.inner.list_items(collection)
    }

    fn get_item(&self, item: &ItemId) -> Result<Item, StoreError> {
        self.inner.get_item(item)
    }

    fn create_item(
        &mut self,
        collection: &CollectionId,
        fields: &FieldMap,
        placements: &[Placement],
    ) -> Result<Item, StoreError> {
        self.inner.create_item(collection, fields, placements)
    }

    fn update_item(&mut self, item: &ItemId, fields: &FieldMap) -> Result<(), StoreError> {
        self.inner.update_item(item, fields)
    }

    fn add_membership(&mut self, item: &ItemId, placement: &Placement) -> Result<(), StoreError> {
        self.inner.add_membership(item, placement)
    }

    fn add_comment(&mut self, item: &ItemId, text: &str) -> Result<(), StoreError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(StoreError::Transport("connection reset".to_string()));
        }
        self.inner.add_comment(item, text)
    }
}

#[test]
fn failed_comment_keeps_earlier_writes_and_a_rerun_finishes() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Backlog"], vec![Comment::human("LGTM")]);
    let dest = fx.seed(Side::B, "Design doc", Some("v0"), &["Backlog"], vec![]);
    let (a, b) = fx.endpoints();
    let mut store = FlakyComments {
        inner: fx.store,
        failures: 1,
    };

    let err = Reconciler::new(&mut store, ReconcileOptions::default())
        .run(&a, &b)
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Transport(_))));
    let applied: Vec<_> = store.inner.take_journal();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].item, dest);
    assert_eq!(
        applied[0].mutation,
        Mutation::UpdateItem {
            fields: fields(&[(SyncField::Notes, json!("v1"))]),
        }
    );

    let rerun = Reconciler::new(&mut store, ReconcileOptions::default())
        .run(&a, &b)
        .expect("rerun");
    assert_eq!(rerun.reconciled(), 1);
    let mutations: Vec<_> = store
        .inner
        .journal()
        .iter()
        .map(|entry| entry.mutation.clone())
        .collect();
    assert_eq!(
        mutations,
        vec![Mutation::AddComment {
            text: "LGTM".to_string()
        }]
    );
}

#[test]
fn system_comments_are_never_copied() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(
        Side::A,
        "Design doc",
        None,
        &["Backlog"],
        vec![
            Comment::system("Alice moved this to Backlog"),
            Comment::human("LGTM"),
        ],
    );

    fx.pass(ReconcileOptions::default()).expect("pass");

    let texts: Vec<_> = fx
        .mutations()
        .into_iter()
        .filter_map(|m| match m {
            Mutation::AddComment { text } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["LGTM".to_string()]);
}

#[test]
fn destination_only_fields_are_preserved() {
    let mut fx = Fixture::new(&[], &[]);
    fx.seed(Side::A, "Design doc", None, &[], vec![]);
    let dest = fx.seed(Side::B, "Design doc", Some("keep me"), &[], vec![]);

    let report = fx.pass(ReconcileOptions::default()).expect("pass");

    assert_eq!(report.mutation_count(), 0);
    let item = fx.store.get_item(&dest).expect("dest item");
    assert_eq!(item.fields.get("notes"), Some(&json!("keep me")));
}

// ---------------------------------------------------------------------------
// Membership policies
// ---------------------------------------------------------------------------

#[test]
fn missing_section_aborts_before_touching_the_item() {
    let mut fx = Fixture::new(&["Backlog", "Icebox"], &["Backlog"]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Icebox"], vec![Comment::human("LGTM")]);
    fx.seed(Side::B, "Design doc", Some("v0"), &[], vec![]);

    let err = fx.pass(ReconcileOptions::default()).unwrap_err();

    match err {
        SyncError::SectionNotFound { section, item, .. } => {
            assert_eq!(section, "Icebox");
            assert_eq!(item, "Design doc");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fx.store.journal().is_empty());
}

#[test]
fn skip_and_log_drops_only_the_missing_membership() {
    let mut fx = Fixture::new(&["Backlog", "Icebox"], &["Backlog"]);
    fx.seed(Side::A, "Design doc", None, &["Icebox", "Backlog"], vec![]);

    let options = ReconcileOptions {
        missing_section: MissingSectionPolicy::SkipAndLog,
        ..Default::default()
    };
    fx.pass(options).expect("pass");

    match &fx.mutations()[0] {
        Mutation::CreateItem { placements, .. } => {
            assert_eq!(placements, &vec![fx.placement(Side::B, "Backlog")]);
        }
        other => panic!("expected create, got {other:?}"),
    }
}

#[rstest]
#[case::first_missing_only(MembershipPolicy::FirstMissingOnly, vec!["Doing"])]
#[case::all_missing(MembershipPolicy::AllMissing, vec!["Doing", "Done"])]
fn membership_policy_limits_added_sections(
    #[case] policy: MembershipPolicy,
    #[case] expected: Vec<&str>,
) {
    let sections = ["Backlog", "Doing", "Done"];
    let mut fx = Fixture::new(&sections, &sections);
    fx.seed(Side::A, "Design doc", None, &["Backlog", "Doing", "Done"], vec![]);
    fx.seed(Side::B, "Design doc", None, &["Backlog"], vec![]);

    let options = ReconcileOptions {
        membership: policy,
        ..Default::default()
    };
    fx.pass(options).expect("pass");

    let expected: Vec<_> = expected
        .into_iter()
        .map(|section| Mutation::AddMembership {
            placement: fx.placement(Side::B, section),
        })
        .collect();
    assert_eq!(fx.mutations(), expected);
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

#[test]
fn dry_run_reports_the_plan_without_mutating() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Backlog"], vec![Comment::human("LGTM")]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Backlog"], vec![]);
    let before = fx.store.clone();

    let options = ReconcileOptions {
        dry_run: true,
        ..Default::default()
    };
    let report = fx.pass(options).expect("pass");

    assert!(report.dry_run);
    assert_eq!(report.created(), 2);
    assert_eq!(report.outcomes[0].item, None);
    let ops: Vec<_> = report.outcomes[0].mutations.iter().map(Mutation::op).collect();
    assert_eq!(ops, vec!["create", "add-comment"]);
    // The repeated name gets a copy of its own.
    assert_eq!(report.outcomes[1].status, ItemStatus::Created);
    let ops: Vec<_> = report.outcomes[1].mutations.iter().map(Mutation::op).collect();
    assert_eq!(ops, vec!["create"]);
    assert_eq!(fx.store, before);
}

#[test]
fn create_only_mode_never_updates_matched_items() {
    let mut fx = Fixture::new(&["Backlog"], &["Backlog"]);
    fx.seed(Side::A, "Design doc", Some("v1"), &["Backlog"], vec![Comment::human("LGTM")]);
    fx.seed(Side::A, "New task", None, &["Backlog"], vec![]);
    fx.seed(Side::B, "Design doc", Some("v0"), &[], vec![]);

    let options = ReconcileOptions {
        mode: ReconcileMode::CreateOnly,
        ..Default::default()
    };
    let report = fx.pass(options).expect("pass");

    assert_eq!(report.created(), 1);
    let ops: Vec<_> = fx.mutations().iter().map(Mutation::op).collect();
    assert_eq!(ops, vec!["create"]);
}
