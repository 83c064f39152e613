use mandalart_core::auth::session::{Session, SessionCheck, SessionError, SessionVerifier};
use mandalart_core::repo::visit_repo::{SqliteVisitRepository, VisitRepository};
use mandalart_core::{AppConfig, CellContent, CellServiceError, CoreRuntime, NavigatorError};
use mandalart_core::routing::cookie::CookieJar;
use uuid::Uuid;

fn runtime() -> CoreRuntime {
    CoreRuntime::start(AppConfig::default()).unwrap()
}

fn topics<'a>(path: impl IntoIterator<Item = &'a mandalart_core::Cell>) -> Vec<String> {
    path.into_iter().map(|cell| cell.topic.clone()).collect()
}

#[test]
fn navigator_moves_through_board_and_records_visits() {
    let runtime = runtime();
    let owner = Uuid::new_v4();
    let (board, root) = runtime
        .board_service()
        .unwrap()
        .create_board(owner, "Goals", None)
        .unwrap();
    let cells = runtime.cell_service().unwrap();
    let health = cells
        .upsert_child(root.id, 0, CellContent::with_topic("Health"))
        .unwrap();
    let sleep = cells
        .upsert_child(health.id, 3, CellContent::with_topic("Sleep"))
        .unwrap();

    let mut nav = runtime.navigator(owner, &board).unwrap();
    assert!(nav.is_at_root());
    assert_eq!(nav.grid().unwrap().filled().count(), 1);

    nav.enter(health.id).unwrap();
    nav.enter(sleep.id).unwrap();
    assert_eq!(topics(nav.path()), vec!["Goals", "Health", "Sleep"]);

    let visits = SqliteVisitRepository::try_new(runtime.connection()).unwrap();
    assert_eq!(visits.last_visited(owner).unwrap(), Some(sleep.id));

    assert_eq!(nav.go_up().unwrap().id, health.id);
    assert_eq!(visits.last_visited(owner).unwrap(), Some(health.id));

    assert_eq!(nav.jump_to(0).unwrap().id, root.id);
    assert_eq!(nav.go_up().unwrap().id, root.id);
    assert_eq!(visits.last_visited(owner).unwrap(), Some(root.id));
}

#[test]
fn navigator_rejects_non_children_and_bad_indices() {
    let runtime = runtime();
    let owner = Uuid::new_v4();
    let (board, root) = runtime
        .board_service()
        .unwrap()
        .create_board(owner, "Goals", None)
        .unwrap();
    let cells = runtime.cell_service().unwrap();
    let child = cells
        .upsert_child(root.id, 0, CellContent::with_topic("a"))
        .unwrap();
    let grandchild = cells
        .upsert_child(child.id, 0, CellContent::with_topic("a.0"))
        .unwrap();

    let mut nav = runtime.navigator(owner, &board).unwrap();
    assert!(matches!(
        nav.enter(grandchild.id),
        Err(NavigatorError::NotAChild { .. })
    ));
    assert!(matches!(
        nav.jump_to(1),
        Err(NavigatorError::IndexOutOfRange { index: 1, len: 1 })
    ));
}

#[test]
fn open_resumes_last_visit_only_within_same_board() {
    let runtime = runtime();
    let owner = Uuid::new_v4();
    let boards = runtime.board_service().unwrap();
    let cells = runtime.cell_service().unwrap();

    let (first, first_root) = boards.create_board(owner, "First", None).unwrap();
    let (second, second_root) = boards.create_board(owner, "Second", None).unwrap();
    let deep = cells
        .upsert_child(first_root.id, 2, CellContent::with_topic("Deep"))
        .unwrap();

    {
        let mut nav = runtime.navigator(owner, &first).unwrap();
        nav.enter(deep.id).unwrap();
    }

    let resumed = runtime.navigator(owner, &first).unwrap();
    assert_eq!(resumed.current().id, deep.id);
    assert_eq!(topics(resumed.path()), vec!["First", "Deep"]);

    let other = runtime.navigator(owner, &second).unwrap();
    assert_eq!(other.current().id, second_root.id);
}

#[test]
fn refresh_cuts_path_at_deleted_cell() {
    let runtime = runtime();
    let owner = Uuid::new_v4();
    let (board, root) = runtime
        .board_service()
        .unwrap()
        .create_board(owner, "Goals", None)
        .unwrap();
    let cells = runtime.cell_service().unwrap();
    let child = cells
        .upsert_child(root.id, 1, CellContent::with_topic("Temporary"))
        .unwrap();

    let mut nav = runtime.navigator(owner, &board).unwrap();
    nav.enter(child.id).unwrap();
    cells.delete_cell(child.id).unwrap();

    assert_eq!(nav.refresh().unwrap().id, root.id);
    assert!(nav.is_at_root());
}

#[test]
fn edits_through_runtime_services_invalidate_shared_cache() {
    let runtime = runtime();
    let owner = Uuid::new_v4();
    let (_, root) = runtime
        .board_service()
        .unwrap()
        .create_board(owner, "Goals", None)
        .unwrap();
    let reader = runtime.cell_service().unwrap();
    let writer = runtime.cell_service().unwrap();

    reader.load_with_children(root.id).unwrap();
    assert_eq!(runtime.cache().len(), 1);

    writer
        .update_content(root.id, CellContent::with_topic("Renamed"))
        .unwrap();
    assert!(runtime.cache().get(root.id).is_none());
    assert_eq!(reader.get_cell(root.id).unwrap().topic, "Renamed");

    drop(reader);
    drop(writer);
    runtime.shutdown();
}

#[test]
fn deleted_board_is_not_served_from_cache() {
    let runtime = runtime();
    let owner = Uuid::new_v4();
    let boards = runtime.board_service().unwrap();
    let cells = runtime.cell_service().unwrap();
    let (board, root) = boards.create_board(owner, "Goals", None).unwrap();
    let child = cells
        .upsert_child(root.id, 4, CellContent::with_topic("Health"))
        .unwrap();

    cells.grid(root.id).unwrap();
    cells.grid(child.id).unwrap();
    assert_eq!(runtime.cache().len(), 2);

    boards.delete_board(board.id).unwrap();

    assert!(runtime.cache().is_empty());
    assert!(matches!(
        cells.grid(root.id),
        Err(CellServiceError::CellNotFound(id)) if id == root.id
    ));
    assert!(matches!(
        cells.get_cell(child.id),
        Err(CellServiceError::CellNotFound(_))
    ));
    assert!(matches!(
        runtime.navigator(owner, &board),
        Err(NavigatorError::Cell(CellServiceError::CellNotFound(_)))
    ));
}

#[test]
fn enter_key_follows_filled_slots_and_rejects_placeholders() {
    let runtime = runtime();
    let owner = Uuid::new_v4();
    let (board, root) = runtime
        .board_service()
        .unwrap()
        .create_board(owner, "Goals", None)
        .unwrap();
    runtime
        .cell_service()
        .unwrap()
        .upsert_child(root.id, 2, CellContent::with_topic("Learn"))
        .unwrap();

    let mut nav = runtime.navigator(owner, &board).unwrap();
    let grid = nav.grid().unwrap();
    let filled_key = grid.slots[2].key();
    let empty_key = grid.slots[3].key();

    assert!(matches!(
        nav.enter_key(&empty_key),
        Err(NavigatorError::PlaceholderSlot(key)) if key == "placeholder-3"
    ));
    assert!(matches!(
        nav.enter_key("not-a-cell"),
        Err(NavigatorError::InvalidSlotKey(_))
    ));
    assert!(nav.is_at_root());

    assert_eq!(nav.enter_key(&filled_key).unwrap().topic, "Learn");
}

struct SignedIn(Uuid);

impl SessionVerifier for SignedIn {
    fn verify(&self, _cookies: &CookieJar) -> Result<SessionCheck, SessionError> {
        Ok(SessionCheck::signed_in(Session {
            user_id: self.0,
            email: None,
            expires_at: i64::MAX,
        }))
    }
}

#[test]
fn runtime_session_manager_tracks_signed_in_user() {
    let runtime = runtime();
    let user = Uuid::new_v4();
    let sessions = runtime.session_manager(SignedIn(user));

    assert!(matches!(
        sessions.require_user(),
        Err(SessionError::NotSignedIn)
    ));
    sessions.refresh(&CookieJar::default(), 0).unwrap();
    assert_eq!(sessions.require_user().unwrap(), user);

    sessions.sign_out();
    assert!(sessions.current().is_none());
}
