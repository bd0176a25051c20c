//! End-to-end tests for a reconciliation run.
//!
//! These tests exercise the real groups file reader, JSON student cache,
//! group catalog, engine and reporters against in-memory Canvas fakes.
//!
//! No network I/O: students and groups come from fixtures.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use groupsync_core::config::LocalIdField;
use groupsync_core::errors::{CoreError, IdentityError, SourceError};
use groupsync_core::identity::{CacheKey, JsonFileCache};
use groupsync_core::models::{GroupSpec, ListedGroup, LocalId, RemoteGroup, RemoteId, StudentRecord};
use groupsync_core::reconcile::{
    GroupReconciliationResult, MembershipDiff, NameMismatch, ReconciliationContext,
    ReconciliationEngine,
};
use groupsync_core::reporter::{JsonReporter, Reporter, TextReporter};
use groupsync_core::sources::{ConfigSource, GroupSource, StudentSource};
use groupsync_core::GroupSpecFile;

const COURSE: u64 = 1234;
const CATEGORY: u64 = 567;
const KEY: CacheKey = CacheKey::new(COURSE);

// ===========================================================================
// Fakes
// ===========================================================================

struct FakeCanvas {
    students: Vec<StudentRecord>,
    groups: Vec<RemoteGroup>,
    student_calls: AtomicUsize,
    fail_students: bool,
}

impl FakeCanvas {
    /// s1..s5 map to 101..105; r999 is a Canvas user unknown to the map.
    fn new(groups: Vec<RemoteGroup>) -> Self {
        Self {
            students: (1..=5u64)
                .map(|n| StudentRecord::new(format!("s{n}"), 100 + n))
                .collect(),
            groups,
            student_calls: AtomicUsize::new(0),
            fail_students: false,
        }
    }
}

#[async_trait]
impl StudentSource for FakeCanvas {
    async fn fetch_all(&self, course_id: u64) -> Result<Vec<StudentRecord>, SourceError> {
        assert_eq!(course_id, COURSE);
        self.student_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_students {
            return Err(SourceError::unavailable("Canvas", "HTTP 503"));
        }
        Ok(self.students.clone())
    }
}

#[async_trait]
impl GroupSource for FakeCanvas {
    async fn fetch_groups_by_category(
        &self,
        course_id: u64,
        category_id: u64,
    ) -> Result<Vec<ListedGroup>, SourceError> {
        assert_eq!((course_id, category_id), (COURSE, CATEGORY));
        Ok(self
            .groups
            .iter()
            .map(|g| ListedGroup::without_members(g.remote_id.get(), g.name.clone()))
            .collect())
    }

    async fn fetch_group_members(
        &self,
        group_id: RemoteId,
    ) -> Result<BTreeSet<RemoteId>, SourceError> {
        self.groups
            .iter()
            .find(|g| g.remote_id == group_id)
            .map(|g| g.member_ids.clone())
            .ok_or_else(|| SourceError::unavailable("group members", "HTTP 404"))
    }
}

// ===========================================================================
// Helpers
// ===========================================================================

fn write_groups_file(dir: &TempDir, json: &str) -> GroupSpecFile {
    let path = dir.path().join("groups.json");
    std::fs::write(&path, json).unwrap();
    GroupSpecFile::new(path)
}

async fn context_for(canvas: &FakeCanvas, dir: &TempDir) -> ReconciliationContext {
    context_with_key(canvas, dir, &KEY).await
}

async fn context_with_key(
    canvas: &FakeCanvas,
    dir: &TempDir,
    key: &CacheKey,
) -> ReconciliationContext {
    let cache = JsonFileCache::new(dir.path().join("students.json"));
    ReconciliationContext::build(&cache, canvas, canvas, key, CATEGORY)
        .await
        .unwrap()
}

fn locals(items: &[&str]) -> BTreeSet<LocalId> {
    items.iter().copied().map(LocalId::from).collect()
}

fn diff_of(result: &GroupReconciliationResult) -> &MembershipDiff {
    result
        .diff()
        .unwrap_or_else(|| panic!("expected Matched, got {result:?}"))
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[tokio::test]
async fn scenario_a_identical_group_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101, 102])]);
    let ctx = context_for(&canvas, &dir).await;

    let spec = GroupSpec::new("Alpha", Some(10), ["s1", "s2"]);
    let result = ReconciliationEngine::new(&ctx).reconcile(&spec);

    assert_eq!(result, GroupReconciliationResult::Matched(MembershipDiff::default()));
}

#[tokio::test]
async fn scenario_b_name_mismatch_only() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101, 102])]);
    let ctx = context_for(&canvas, &dir).await;

    let spec = GroupSpec::new("Team Alpha", Some(10), ["s1", "s2"]);
    let result = ReconciliationEngine::new(&ctx).reconcile(&spec);
    let diff = diff_of(&result);

    assert_eq!(
        diff.name_mismatch,
        Some(NameMismatch {
            remote: "Alpha".into(),
            local: "Team Alpha".into()
        })
    );
    assert!(diff.to_add.is_empty());
    assert!(diff.to_remove.is_empty());
    assert!(diff.unresolved_local.is_empty());
    assert!(diff.unresolved_remote.is_empty());
}

#[tokio::test]
async fn scenario_c_extra_remote_member() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101, 102])]);
    let ctx = context_for(&canvas, &dir).await;

    let spec = GroupSpec::new("Alpha", Some(10), ["s1"]);
    let result = ReconciliationEngine::new(&ctx).reconcile(&spec);
    let diff = diff_of(&result);

    assert_eq!(diff.to_remove, locals(&["s2"]));
    assert!(diff.to_add.is_empty());
}

#[tokio::test]
async fn scenario_d_orphaned_reference() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101])]);
    let ctx = context_for(&canvas, &dir).await;

    let spec = GroupSpec::new("Ghost", Some(999), ["s1"]);
    assert_eq!(
        ReconciliationEngine::new(&ctx).reconcile(&spec),
        GroupReconciliationResult::OrphanedReference {
            remote_id: RemoteId::new(999)
        }
    );
}

#[tokio::test]
async fn scenario_e_unresolved_local_member() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101])]);
    let ctx = context_for(&canvas, &dir).await;

    let spec = GroupSpec::new("Alpha", Some(10), ["sX", "s1", "s3"]);
    let result = ReconciliationEngine::new(&ctx).reconcile(&spec);
    let diff = diff_of(&result);

    assert_eq!(diff.unresolved_local, locals(&["sX"]));
    assert_eq!(diff.to_add, locals(&["s3"]));
    assert!(diff.to_remove.is_empty());
}

#[tokio::test]
async fn scenario_f_pending_creation() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![]);
    let ctx = context_for(&canvas, &dir).await;

    let spec = GroupSpec::new("Alpha", None, ["s1"]);
    assert_eq!(
        ReconciliationEngine::new(&ctx).reconcile(&spec),
        GroupReconciliationResult::PendingCreation
    );
}

// ===========================================================================
// Properties
// ===========================================================================

#[tokio::test]
async fn reconcile_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101, 103, 999])]);
    let ctx = context_for(&canvas, &dir).await;
    let engine = ReconciliationEngine::new(&ctx);
    let specs = vec![
        GroupSpec::new("Team Alpha", Some(10), ["s1", "s2", "sX"]),
        GroupSpec::new("Beta", None, ["s4"]),
    ];

    let first = engine.reconcile_all(&specs);
    let second = engine.reconcile_all(&specs);
    assert_eq!(first, second);
    assert_eq!(JsonReporter.render(&first), JsonReporter.render(&second));
}

#[tokio::test]
async fn member_order_does_not_matter() {
    let dir = tempfile::tempdir().unwrap();
    let forward = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101, 102, 105, 999])]);
    let backward = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [999, 105, 102, 101])]);
    let ctx_forward = context_for(&forward, &dir).await;
    let ctx_backward = context_for(&backward, &dir).await;

    let spec_forward: GroupSpec =
        serde_json::from_str(r#"{"name":"Alpha","id":10,"members":["s1","s3","sX"]}"#).unwrap();
    let spec_backward: GroupSpec =
        serde_json::from_str(r#"{"name":"Alpha","id":10,"members":["sX","s3","s1"]}"#).unwrap();

    let expected = ReconciliationEngine::new(&ctx_forward).reconcile(&spec_forward);
    assert_eq!(ReconciliationEngine::new(&ctx_backward).reconcile(&spec_forward), expected);
    assert_eq!(ReconciliationEngine::new(&ctx_forward).reconcile(&spec_backward), expected);
    assert_eq!(ReconciliationEngine::new(&ctx_backward).reconcile(&spec_backward), expected);

    let diff = diff_of(&expected);
    assert_eq!(diff.to_add, locals(&["s3"]));
    assert_eq!(diff.to_remove, locals(&["s2", "s5"]));
}

#[tokio::test]
async fn parallel_evaluation_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![
        RemoteGroup::new(10, "Alpha", [101, 102]),
        RemoteGroup::new(11, "Beta", [103]),
        RemoteGroup::new(12, "Gamma", [104, 999]),
    ]);
    let ctx = context_for(&canvas, &dir).await;
    let engine = ReconciliationEngine::new(&ctx);
    let specs = vec![
        GroupSpec::new("Alpha", Some(10), ["s1", "s2"]),
        GroupSpec::new("Beta team", Some(11), ["s3", "s5"]),
        GroupSpec::new("Gamma", Some(12), ["s4"]),
        GroupSpec::new("Delta", None, ["s1"]),
        GroupSpec::new("Ghost", Some(404), Vec::<&str>::new()),
    ];

    let sequential: BTreeMap<String, GroupReconciliationResult> = specs
        .iter()
        .map(|s| (s.name.clone(), engine.reconcile(s)))
        .collect();

    let parallel: BTreeMap<String, GroupReconciliationResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = specs
            .iter()
            .rev()
            .map(|spec| scope.spawn(move || (spec.name.clone(), engine.reconcile(spec))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}

// ===========================================================================
// Full run
// ===========================================================================

#[tokio::test]
async fn full_run_from_groups_file() {
    let dir = tempfile::tempdir().unwrap();
    let groups_file = write_groups_file(
        &dir,
        r#"{
  "groups": [
    { "name": "Team Alpha", "id": 10, "members": ["s1", "s2", "s3"] },
    { "name": "Beta", "id": 11, "members": ["s4"] },
    { "name": "Gamma", "members": ["s5"] },
    { "name": "Ghost", "id": 404, "members": [] }
  ]
}"#,
    );
    let canvas = FakeCanvas::new(vec![
        RemoteGroup::new(10, "Alpha", [101, 102, 105]),
        RemoteGroup::new(11, "Beta", [104]),
        RemoteGroup::new(12, "Leftover", []),
    ]);

    let specs = groups_file.read_group_specs().unwrap();
    let ctx = context_for(&canvas, &dir).await;
    let report = ReconciliationEngine::new(&ctx).reconcile_all(&specs);

    assert_eq!(report.outcomes.len(), 4);
    assert!(!report.is_in_sync());
    assert_eq!(report.summary.clean, 1);
    assert_eq!(report.summary.drifted, 1);
    assert_eq!(report.summary.pending_creation, 1);
    assert_eq!(report.summary.orphaned, 1);
    assert_eq!(report.unreferenced_groups.len(), 1);
    assert_eq!(report.unreferenced_groups[0].name, "Leftover");

    let text = TextReporter::default().render(&report);
    assert!(text.contains("Name needs to be changed from Alpha to Team Alpha"));
    assert!(text.contains("Needs to be added: s3"));
    assert!(text.contains("Needs to be removed: s5"));
    assert!(text.contains("Group Gamma does not exist yet."));
    assert!(text.contains("Group Ghost has id 404, which does not exist on Canvas."));
    assert!(!text.contains("Group Beta"));
}

#[tokio::test]
async fn second_run_reuses_cached_students() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101])]);

    let first = context_for(&canvas, &dir).await;
    assert_eq!(canvas.student_calls.load(Ordering::SeqCst), 1);
    assert!(dir.path().join("students.json").exists());

    let second = context_for(&canvas, &dir).await;
    assert_eq!(canvas.student_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.identifiers, second.identifiers);
}

#[tokio::test]
async fn changing_local_id_field_refetches_students() {
    let dir = tempfile::tempdir().unwrap();
    let mut canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101])]);

    let by_login = context_for(&canvas, &dir).await;
    assert_eq!(
        by_login.identifiers.lookup_remote(&LocalId::from("s1")),
        Some(RemoteId::new(101))
    );

    // Same Canvas users, now identified by SIS id.
    canvas.students = (1..=5u64)
        .map(|n| StudentRecord::new(format!("SIS-{n}"), 100 + n))
        .collect();
    let by_sis_key = KEY.with_local_id_field(LocalIdField::SisUserId);
    let by_sis = context_with_key(&canvas, &dir, &by_sis_key).await;

    assert_eq!(canvas.student_calls.load(Ordering::SeqCst), 2);
    assert_eq!(by_sis.identifiers.lookup_remote(&LocalId::from("s1")), None);
    assert_eq!(
        by_sis.identifiers.lookup_local(RemoteId::new(101)),
        Some(&LocalId::from("SIS-1"))
    );

    let spec = GroupSpec::new("Alpha", Some(10), ["SIS-1"]);
    assert!(ReconciliationEngine::new(&by_sis).reconcile(&spec).is_clean());
}

#[tokio::test]
async fn unavailable_students_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut canvas = FakeCanvas::new(vec![RemoteGroup::new(10, "Alpha", [101])]);
    canvas.fail_students = true;

    let cache = JsonFileCache::new(dir.path().join("students.json"));
    let result = ReconciliationContext::build(&cache, &canvas, &canvas, &KEY, CATEGORY).await;

    assert!(matches!(
        result,
        Err(CoreError::Identity(IdentityError::SourceUnavailable(_)))
    ));
}

#[tokio::test]
async fn duplicate_student_ids_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut canvas = FakeCanvas::new(vec![]);
    canvas.students.push(StudentRecord::new("s1-alt", 101));

    let cache = JsonFileCache::new(dir.path().join("students.json"));
    let result = ReconciliationContext::build(&cache, &canvas, &canvas, &KEY, CATEGORY).await;

    assert!(matches!(
        result,
        Err(CoreError::Identity(IdentityError::DuplicateRemoteId { .. }))
    ));
    assert!(!dir.path().join("students.json").exists());
}
