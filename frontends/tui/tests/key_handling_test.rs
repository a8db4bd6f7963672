/// Integration tests for keyboard handling and rendering
///
/// Drives `State` with crossterm key events against the in-memory backend and
/// renders into ratatui's TestBackend, so no real terminal is needed.
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pasajes_client::{FakeCall, FakeOperation, PasajesFake, RecordId, RecordService};
use pasajes_editor::{
    EditorController, EditorMode, FixedClock, FormField, TableBody, DELETE_PROMPT,
};
use pasajes_tui::{AppMain, Command, Focus, Keymap, State, StatusKind};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use std::path::PathBuf;
use std::sync::Arc;

fn clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2025, 1, 20)
            .unwrap()
            .and_hms_opt(8, 45, 0)
            .unwrap(),
    )
}

async fn started(export_path: PathBuf) -> (Arc<PasajesFake>, State) {
    let fake = Arc::new(PasajesFake::demo());
    let service: Arc<dyn RecordService> = fake.clone();
    let controller = EditorController::with_clock(service, clock());
    let mut state = State::new(controller, Keymap::default(), export_path);
    state.init().await;
    fake.clear_calls().await;
    (fake, state)
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

async fn type_text(state: &mut State, text: &str) {
    for c in text.chars() {
        state.handle_key(press(KeyCode::Char(c))).await;
    }
}

fn screen(state: &State) -> String {
    let mut terminal = Terminal::new(TestBackend::new(110, 30)).unwrap();
    terminal
        .draw(|frame| AppMain::default().render(frame, state))
        .unwrap();
    let buffer = terminal.backend().buffer();
    buffer
        .content()
        .chunks(buffer.area.width as usize)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_initial_screen_lists_demo_records() {
    let (_, state) = started(PathBuf::from("unused.csv")).await;

    assert_eq!(state.status().text, "3 pasajes");
    let screen = screen(&state);
    assert!(screen.contains("Nuevo Pasaje"));
    assert!(screen.contains("Emitir Pasaje"));
    assert!(screen.contains("Todas las rutas"));
    assert!(screen.contains("Carmen Vega"));
    assert!(screen.contains("15/01/2025 18:45"));
    assert!(screen.contains("$1.75"));
}

#[tokio::test]
async fn test_edit_and_update_selected_row() {
    let (fake, mut state) = started(PathBuf::from("unused.csv")).await;

    // Newest first, so the first row is pasaje 3
    assert_eq!(state.selected_id(), Some(RecordId(3)));
    state.handle_key(press(KeyCode::Char('e'))).await;
    assert_eq!(state.controller().mode(), EditorMode::Edit(RecordId(3)));
    assert_eq!(state.focus(), Focus::Field(FormField::Route));
    assert!(screen(&state).contains("Actualizar Pasaje"));

    for _ in 0..4 {
        state.handle_key(press(KeyCode::Tab)).await;
    }
    assert_eq!(state.focus(), Focus::Field(FormField::PassengerName));
    type_text(&mut state, " R.").await;
    assert_eq!(state.controller().form().passenger_name, "Carmen Vega R.");

    state.handle_key(press(KeyCode::Enter)).await;
    assert_eq!(state.status().text, "Pasaje 3 actualizado");
    assert_eq!(state.controller().mode(), EditorMode::Create);
    assert!(matches!(
        fake.calls().await.first(),
        Some(FakeCall::Update(RecordId(3), payload)) if payload.passenger_name == "Carmen Vega R."
    ));
}

#[tokio::test]
async fn test_letters_typed_into_text_fields_are_not_commands() {
    let (fake, mut state) = started(PathBuf::from("unused.csv")).await;

    state.handle_key(press(KeyCode::BackTab)).await;
    assert_eq!(state.focus(), Focus::Field(FormField::PassengerName));
    type_text(&mut state, "quedx").await;

    assert_eq!(state.controller().form().passenger_name, "quedx");
    assert!(!state.should_quit());
    assert!(state.pending_delete().is_none());
    assert!(fake.calls().await.is_empty());

    state.handle_key(press(KeyCode::Backspace)).await;
    assert_eq!(state.controller().form().passenger_name, "qued");

    state
        .handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL))
        .await;
    assert!(state.should_quit());
}

#[tokio::test]
async fn test_select_fields_cycle_through_options() {
    let (_, mut state) = started(PathBuf::from("unused.csv")).await;

    state.handle_key(press(KeyCode::Tab)).await;
    assert_eq!(state.focus(), Focus::Field(FormField::Route));
    assert_eq!(state.display_value(FormField::Route), "Seleccione...");

    state.handle_key(press(KeyCode::Right)).await;
    assert_eq!(state.controller().form().route_id, "1");
    state.handle_key(press(KeyCode::Right)).await;
    assert_eq!(state.display_value(FormField::Route), "Quito - Latacunga");
    state.handle_key(press(KeyCode::Left)).await;
    state.handle_key(press(KeyCode::Left)).await;
    assert_eq!(state.controller().form().route_id, "3");
}

#[tokio::test]
async fn test_create_from_keyboard() {
    let (fake, mut state) = started(PathBuf::from("unused.csv")).await;

    state.handle_key(press(KeyCode::Tab)).await;
    state.handle_key(press(KeyCode::Right)).await;
    state.handle_key(press(KeyCode::Tab)).await;
    state.handle_key(press(KeyCode::Right)).await;
    state.handle_key(press(KeyCode::Tab)).await;
    state.handle_key(press(KeyCode::Right)).await;
    state.handle_key(press(KeyCode::Tab)).await;
    assert_eq!(state.controller().form().travel_at, "2025-01-20T08:45");
    state.handle_key(press(KeyCode::Tab)).await;
    type_text(&mut state, "Pedro").await;

    state.handle_key(press(KeyCode::Enter)).await;
    assert_eq!(state.status().text, "Pasaje emitido");
    assert_eq!(state.controller().store().len(), 4);
    assert_eq!(state.controller().form().passenger_name, "");
    assert!(matches!(fake.calls().await.first(), Some(FakeCall::Create(_))));
}

#[tokio::test]
async fn test_failed_submit_shows_server_error_and_keeps_form() {
    let (fake, mut state) = started(PathBuf::from("unused.csv")).await;
    state.handle_key(press(KeyCode::Char('e'))).await;
    fake.fail_next_with_message(FakeOperation::Update, "ORA-12899: value too large")
        .await;

    state.handle_key(press(KeyCode::Enter)).await;

    assert_eq!(state.status().kind, StatusKind::Error);
    assert_eq!(state.status().text, "Error: ORA-12899: value too large");
    assert_eq!(state.controller().mode(), EditorMode::Edit(RecordId(3)));
    assert_eq!(state.controller().form().passenger_name, "Carmen Vega");
}

#[tokio::test]
async fn test_missing_field_reported_without_request() {
    let (fake, mut state) = started(PathBuf::from("unused.csv")).await;

    state.handle_key(press(KeyCode::Enter)).await;

    assert_eq!(state.status().kind, StatusKind::Error);
    assert!(fake.calls().await.is_empty());
}

#[tokio::test]
async fn test_delete_modal_declined_then_confirmed() {
    let (fake, mut state) = started(PathBuf::from("unused.csv")).await;
    state.handle_key(press(KeyCode::Down)).await;
    assert_eq!(state.selected_id(), Some(RecordId(2)));

    state.handle_key(press(KeyCode::Char('d'))).await;
    assert_eq!(state.pending_delete(), Some(RecordId(2)));
    assert!(screen(&state).contains(DELETE_PROMPT));

    // Other keys are ignored while the modal is open
    assert_eq!(state.on_key(press(KeyCode::Char('e'))), None);

    state.handle_key(press(KeyCode::Char('n'))).await;
    assert_eq!(state.pending_delete(), None);
    assert_eq!(state.status().text, "Eliminación cancelada");
    assert!(fake.calls().await.is_empty());

    state.handle_key(press(KeyCode::Char('d'))).await;
    assert_eq!(
        state.on_key(press(KeyCode::Char('y'))),
        Some(Command::Delete {
            id: RecordId(2),
            confirmed: true
        })
    );
    state
        .run_command(Command::Delete {
            id: RecordId(2),
            confirmed: true,
        })
        .await;
    assert_eq!(state.status().text, "Pasaje eliminado");
    assert_eq!(state.controller().store().len(), 2);
    assert!(!state.controller().store().contains(RecordId(2)));
}

#[tokio::test]
async fn test_selection_matches_table_rows() {
    let (_, mut state) = started(PathBuf::from("unused.csv")).await;
    let row_ids: Vec<RecordId> = match state.controller().table() {
        TableBody::Rows(rows) => rows.iter().map(|row| row.id).collect(),
        other => panic!("expected rows, got {:?}", other),
    };
    assert_eq!(row_ids, vec![RecordId(3), RecordId(2), RecordId(1)]);

    for expected in &row_ids {
        assert_eq!(state.selected_id(), Some(*expected));
        state.handle_key(press(KeyCode::Down)).await;
    }
    // Down on the last row keeps it selected
    assert_eq!(state.selected_index(), 2);
    assert_eq!(state.selected_id(), Some(RecordId(1)));
}

#[tokio::test]
async fn test_deleting_last_row_clamps_selection() {
    let (_, mut state) = started(PathBuf::from("unused.csv")).await;
    state.handle_key(press(KeyCode::Down)).await;
    state.handle_key(press(KeyCode::Down)).await;
    state.handle_key(press(KeyCode::Down)).await;
    assert_eq!(state.selected_index(), 2);

    state.handle_key(press(KeyCode::Char('d'))).await;
    state.handle_key(press(KeyCode::Char('y'))).await;

    assert_eq!(state.selected_index(), 1);
    assert_eq!(state.selected_id(), Some(RecordId(2)));
}

#[tokio::test]
async fn test_filter_cycles_through_routes() {
    let (fake, mut state) = started(PathBuf::from("unused.csv")).await;

    state.handle_key(press(KeyCode::Char('f'))).await;
    assert_eq!(state.controller().active_filter(), Some("1"));
    assert_eq!(state.status().text, "Quito - Ambato: 2 pasajes");
    assert!(screen(&state).contains("Filtrar por ruta: Quito - Ambato"));

    state.handle_key(press(KeyCode::Char('f'))).await;
    state.handle_key(press(KeyCode::Char('f'))).await;
    assert_eq!(state.controller().active_filter(), Some("3"));
    assert!(screen(&state).contains("No hay pasajes registrados"));

    state.handle_key(press(KeyCode::Char('f'))).await;
    assert_eq!(state.controller().active_filter(), None);
    assert_eq!(
        fake.calls().await.last(),
        Some(&FakeCall::List { route_id: None })
    );
}

#[tokio::test]
async fn test_refresh_failure_shows_error_placeholder() {
    let (fake, mut state) = started(PathBuf::from("unused.csv")).await;
    state.handle_key(press(KeyCode::Char('e'))).await;
    fake.fail_next_with_message(FakeOperation::List, "ORA-12541: TNS:no listener")
        .await;

    state.handle_key(press(KeyCode::Char('r'))).await;

    assert_eq!(state.status().kind, StatusKind::Error);
    assert_eq!(state.controller().mode(), EditorMode::Create);
    assert!(screen(&state).contains("Error al cargar datos"));
}

#[tokio::test]
async fn test_export_writes_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reporte_pasajes.csv");
    let (_, mut state) = started(path.clone()).await;

    state.handle_key(press(KeyCode::Char('x'))).await;

    assert_eq!(
        state.status().text,
        format!("Reporte exportado a {}", path.display())
    );
    let csv = std::fs::read_to_string(&path).unwrap();
    assert!(csv.starts_with("ID_PASAJE,FECHA_VIAJE"));
    assert_eq!(csv.lines().count(), 4);
}

#[tokio::test]
async fn test_busy_status_is_set_before_request() {
    let (_, mut state) = started(PathBuf::from("unused.csv")).await;

    let command = state.on_key(press(KeyCode::Char('r'))).unwrap();
    state.begin(&command);

    assert_eq!(state.status().kind, StatusKind::Busy);
    assert_eq!(state.status().text, "Cargando...");
}
