use swarmplan_core::{
    plan_reorder, BackendError, BackendResult, Container, CreateRequest, DragSession, DropEvent,
    DropPosition, EdgeHint, Entity, EntityDraft, EntityId, EntityKind, EntityStore, OrderRecord,
    PersistenceBackend, SyncCoordinator, SyncError,
};
use uuid::Uuid;

/// Mock transport recording every call; failures are armed per endpoint.
#[derive(Default)]
struct RecordingBackend {
    batches: Vec<Vec<OrderRecord>>,
    creates: Vec<EntityDraft>,
    lifecycle: Vec<(EntityId, bool, Option<i64>)>,
    fail_push: bool,
    fail_create: bool,
    fail_lifecycle: bool,
    assigned_id: Option<EntityId>,
}

impl PersistenceBackend for RecordingBackend {
    fn push_order_batch(&mut self, records: &[OrderRecord]) -> BackendResult<()> {
        self.batches.push(records.to_vec());
        if self.fail_push {
            return Err(BackendError::Network("connection reset".to_string()));
        }
        Ok(())
    }

    fn create_entity(&mut self, draft: &EntityDraft) -> BackendResult<EntityId> {
        self.creates.push(draft.clone());
        if self.fail_create {
            return Err(BackendError::Status {
                code: 500,
                message: "insert failed".to_string(),
            });
        }
        Ok(self.assigned_id.unwrap_or_else(Uuid::new_v4))
    }

    fn set_lifecycle(
        &mut self,
        id: EntityId,
        closed: bool,
        sort_order: Option<i64>,
    ) -> BackendResult<()> {
        self.lifecycle.push((id, closed, sort_order));
        if self.fail_lifecycle {
            return Err(BackendError::Network("timeout".to_string()));
        }
        Ok(())
    }
}

struct Fixture {
    store: EntityStore,
    area: EntityId,
    tasks: Vec<EntityId>,
}

fn fixture(task_count: usize) -> Fixture {
    let mut store = EntityStore::new();
    let domain = Entity::new(EntityKind::Domain, None, "root");
    let domain_id = domain.id;
    store.insert(domain).unwrap();

    let mut area = Entity::new(EntityKind::Area, Some(domain_id), "inbox");
    area.sort_order = Some(0);
    let area_id = area.id;
    store.insert(area).unwrap();

    let mut tasks = Vec::new();
    for index in 0..task_count {
        let mut task = Entity::new(EntityKind::Task, Some(area_id), format!("t{index}"));
        task.sort_order = Some(index as i64);
        tasks.push(task.id);
        store.insert(task).unwrap();
    }

    Fixture {
        store,
        area: area_id,
        tasks,
    }
}

fn move_to_end(fx: &Fixture, source: EntityId) -> DropEvent {
    DropEvent {
        source_id: source,
        source_container: Container::tasks_of(fx.area),
        target_container: Container::tasks_of(fx.area),
        position: DropPosition::End,
    }
}

fn orders(store: &EntityStore, ids: &[EntityId]) -> Vec<Option<i64>> {
    ids.iter()
        .map(|id| store.get(*id).unwrap().sort_order)
        .collect()
}

#[test]
fn commit_drop_sends_one_batch_and_keeps_new_order() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());

    let event = move_to_end(&fx, fx.tasks[0]);
    let plan = plan_reorder(&fx.store, &event).unwrap().unwrap();
    sync.commit_drop(&mut fx.store, &plan).unwrap();

    assert_eq!(sync.backend().batches.len(), 1);
    assert_eq!(sync.backend().batches[0].len(), 3);
    assert_eq!(
        orders(&fx.store, &fx.tasks),
        vec![Some(2), Some(0), Some(1)]
    );
    assert!(sync.take_notifications().is_empty());
}

#[test]
fn failed_commit_restores_pre_drop_order_and_notifies_once() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend {
        fail_push: true,
        ..RecordingBackend::default()
    });

    let event = move_to_end(&fx, fx.tasks[0]);
    let plan = plan_reorder(&fx.store, &event).unwrap().unwrap();
    let err = sync.commit_drop(&mut fx.store, &plan).unwrap_err();
    assert!(matches!(err, SyncError::Persistence(_)));

    // Exact pre-drop state, not an approximation.
    assert_eq!(
        orders(&fx.store, &fx.tasks),
        vec![Some(0), Some(1), Some(2)]
    );
    let notifications = sync.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].operation, "reorder");
    assert!(sync.take_notifications().is_empty());
}

#[test]
fn staged_drops_for_one_container_supersede_into_one_batch() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());

    // First drag: t0 to the end. Second drag before any flush: t1 to the end.
    let plan = plan_reorder(&fx.store, &move_to_end(&fx, fx.tasks[0]))
        .unwrap()
        .unwrap();
    sync.stage_drop(&mut fx.store, &plan).unwrap();
    let plan = plan_reorder(&fx.store, &move_to_end(&fx, fx.tasks[1]))
        .unwrap()
        .unwrap();
    sync.stage_drop(&mut fx.store, &plan).unwrap();
    assert!(sync.has_staged());

    sync.flush(&mut fx.store).unwrap();
    assert!(!sync.has_staged());

    // One round trip carrying the final order, not two.
    assert_eq!(sync.backend().batches.len(), 1);
    let expected = orders(&fx.store, &fx.tasks);
    assert_eq!(expected, vec![Some(1), Some(2), Some(0)]);
    for record in &sync.backend().batches[0] {
        let stored = fx.store.get(record.id).unwrap().sort_order;
        assert_eq!(record.sort_order, stored);
    }
}

#[test]
fn commit_absorbs_a_staged_batch_on_the_same_container() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());

    // First drag only staged, second drag committed straight away. The
    // staged payload is older than the committed one; flushing it afterwards
    // would put the server on stale orders.
    let plan = plan_reorder(&fx.store, &move_to_end(&fx, fx.tasks[0]))
        .unwrap()
        .unwrap();
    sync.stage_drop(&mut fx.store, &plan).unwrap();
    let plan = plan_reorder(&fx.store, &move_to_end(&fx, fx.tasks[1]))
        .unwrap()
        .unwrap();
    sync.commit_drop(&mut fx.store, &plan).unwrap();

    assert!(!sync.has_staged());
    sync.flush(&mut fx.store).unwrap();

    // One round trip total; the server matches the display.
    assert_eq!(sync.backend().batches.len(), 1);
    for record in &sync.backend().batches[0] {
        let stored = fx.store.get(record.id).unwrap().sort_order;
        assert_eq!(record.sort_order, stored);
    }
}

#[test]
fn failed_commit_after_staging_unwinds_both_drops() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend {
        fail_push: true,
        ..RecordingBackend::default()
    });

    let plan = plan_reorder(&fx.store, &move_to_end(&fx, fx.tasks[0]))
        .unwrap()
        .unwrap();
    sync.stage_drop(&mut fx.store, &plan).unwrap();
    let plan = plan_reorder(&fx.store, &move_to_end(&fx, fx.tasks[1]))
        .unwrap()
        .unwrap();
    let err = sync.commit_drop(&mut fx.store, &plan).unwrap_err();
    assert!(matches!(err, SyncError::Persistence(_)));

    // The absorbed batch's earlier snapshot wins: state before the first
    // drag, one notification for the one failed round trip.
    assert_eq!(
        orders(&fx.store, &fx.tasks),
        vec![Some(0), Some(1), Some(2)]
    );
    assert_eq!(sync.take_notifications().len(), 1);
    assert!(!sync.has_staged());
}

#[test]
fn cancelled_drag_touches_neither_store_nor_backend() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());
    let before = orders(&fx.store, &fx.tasks);

    let mut session = DragSession::begin(fx.tasks[0], Container::tasks_of(fx.area));
    session.over_item(Container::tasks_of(fx.area), fx.tasks[2], EdgeHint::Below);
    session.clear_hover();

    if let Some(event) = session.complete() {
        let plan = plan_reorder(&fx.store, &event).unwrap().unwrap();
        sync.commit_drop(&mut fx.store, &plan).unwrap();
    }

    assert_eq!(orders(&fx.store, &fx.tasks), before);
    assert!(sync.backend().batches.is_empty());
    assert!(sync.take_notifications().is_empty());
}

#[test]
fn failed_flush_rolls_back_to_the_earliest_staged_state() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend {
        fail_push: true,
        ..RecordingBackend::default()
    });

    let plan = plan_reorder(&fx.store, &move_to_end(&fx, fx.tasks[0]))
        .unwrap()
        .unwrap();
    sync.stage_drop(&mut fx.store, &plan).unwrap();
    let plan = plan_reorder(&fx.store, &move_to_end(&fx, fx.tasks[1]))
        .unwrap()
        .unwrap();
    sync.stage_drop(&mut fx.store, &plan).unwrap();

    let err = sync.flush(&mut fx.store).unwrap_err();
    assert!(matches!(err, SyncError::Persistence(_)));

    // Both drags unwind to the state before the first one.
    assert_eq!(
        orders(&fx.store, &fx.tasks),
        vec![Some(0), Some(1), Some(2)]
    );
    assert_eq!(sync.take_notifications().len(), 1);
}

#[test]
fn commit_create_uses_backend_id_and_appends() {
    let mut fx = fixture(2);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());

    let id = sync
        .commit_create(
            &mut fx.store,
            CreateRequest {
                kind: EntityKind::Task,
                parent_id: Some(fx.area),
                name: "new task".to_string(),
                priority: true,
                sort_order: None,
            },
        )
        .unwrap();

    let created = fx.store.get(id).unwrap();
    assert_eq!(created.name, "new task");
    assert_eq!(created.sort_order, Some(2));
    assert!(created.priority);
    assert_eq!(sync.backend().creates.len(), 1);
    assert_eq!(sync.backend().creates[0].sort_order, 2);
}

#[test]
fn failed_create_leaves_store_untouched() {
    let mut fx = fixture(2);
    let mut sync = SyncCoordinator::new(RecordingBackend {
        fail_create: true,
        ..RecordingBackend::default()
    });

    let err = sync
        .commit_create(
            &mut fx.store,
            CreateRequest {
                kind: EntityKind::Task,
                parent_id: Some(fx.area),
                name: "doomed".to_string(),
                priority: false,
                sort_order: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, SyncError::Persistence(_)));

    assert_eq!(fx.store.list(Container::tasks_of(fx.area)).len(), 2);
    assert_eq!(sync.take_notifications().len(), 1);
}

#[test]
fn create_rejected_by_the_store_is_reported_not_silent() {
    let mut fx = fixture(1);
    // The backend hands back an id the store already holds, so the local
    // insert is refused after the remote create succeeded.
    let mut sync = SyncCoordinator::new(RecordingBackend {
        assigned_id: Some(fx.tasks[0]),
        ..RecordingBackend::default()
    });

    let err = sync
        .commit_create(
            &mut fx.store,
            CreateRequest {
                kind: EntityKind::Task,
                parent_id: Some(fx.area),
                name: "duplicate".to_string(),
                priority: false,
                sort_order: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));

    // The remote entity exists without a local counterpart; that divergence
    // must surface to the user.
    assert_eq!(sync.backend().creates.len(), 1);
    let notifications = sync.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].operation, "create");
}

#[test]
fn close_clears_sort_order_and_reports_null() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());

    sync.commit_close(&mut fx.store, fx.tasks[1]).unwrap();

    let closed = fx.store.get(fx.tasks[1]).unwrap();
    assert!(closed.closed);
    assert_eq!(closed.sort_order, None);
    // Siblings keep their gapped orders.
    assert_eq!(fx.store.get(fx.tasks[2]).unwrap().sort_order, Some(2));
    assert_eq!(sync.backend().lifecycle, vec![(fx.tasks[1], true, None)]);
}

#[test]
fn closing_twice_skips_the_second_network_call() {
    let mut fx = fixture(1);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());

    sync.commit_close(&mut fx.store, fx.tasks[0]).unwrap();
    sync.commit_close(&mut fx.store, fx.tasks[0]).unwrap();

    assert_eq!(sync.backend().lifecycle.len(), 1);
}

#[test]
fn failed_close_rolls_back_the_entity() {
    let mut fx = fixture(2);
    let mut sync = SyncCoordinator::new(RecordingBackend {
        fail_lifecycle: true,
        ..RecordingBackend::default()
    });

    let err = sync.commit_close(&mut fx.store, fx.tasks[0]).unwrap_err();
    assert!(matches!(err, SyncError::Persistence(_)));

    let entity = fx.store.get(fx.tasks[0]).unwrap();
    assert!(!entity.closed);
    assert_eq!(entity.sort_order, Some(0));
    assert_eq!(sync.take_notifications().len(), 1);
}

#[test]
fn reopen_appends_after_open_siblings() {
    let mut fx = fixture(3);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());

    sync.commit_close(&mut fx.store, fx.tasks[0]).unwrap();
    sync.commit_reopen(&mut fx.store, fx.tasks[0]).unwrap();

    let reopened = fx.store.get(fx.tasks[0]).unwrap();
    assert!(!reopened.closed);
    // Open siblings keep orders 1 and 2; reopening appends past them.
    assert_eq!(reopened.sort_order, Some(3));
    assert_eq!(
        sync.backend().lifecycle,
        vec![(fx.tasks[0], true, None), (fx.tasks[0], false, Some(3))]
    );
}

#[test]
fn reopen_into_empty_container_starts_at_zero() {
    let mut fx = fixture(1);
    let mut sync = SyncCoordinator::new(RecordingBackend::default());

    sync.commit_close(&mut fx.store, fx.tasks[0]).unwrap();
    sync.commit_reopen(&mut fx.store, fx.tasks[0]).unwrap();

    assert_eq!(fx.store.get(fx.tasks[0]).unwrap().sort_order, Some(0));
}

#[test]
fn order_record_wire_shape_is_camel_case_with_explicit_null() {
    let id = Uuid::new_v4();
    let cleared = OrderRecord {
        id,
        sort_order: None,
        parent_id: None,
    };
    let value = serde_json::to_value(&cleared).unwrap();
    assert_eq!(value["id"], serde_json::json!(id.to_string()));
    assert!(value["sortOrder"].is_null());
    assert!(value.get("parentId").is_none());

    let parent = Uuid::new_v4();
    let moved = OrderRecord {
        id,
        sort_order: Some(4),
        parent_id: Some(parent),
    };
    let value = serde_json::to_value(&moved).unwrap();
    assert_eq!(value["sortOrder"], serde_json::json!(4));
    assert_eq!(value["parentId"], serde_json::json!(parent.to_string()));
}
