use std::path::Path;
use std::time::Duration;

use crossterm::event::KeyCode;
use gridreader::inputs::InputEvent;
use gridreader::test_utils::test_helpers::{
    LinesLayout, MemoryDocument, TestScenarioBuilder, capture_terminal_state,
    create_test_terminal, numbered_chapter,
};
use gridreader::{Action, App, MarkStore, Pager, ReaderError};
use tempfile::TempDir;

fn three_chapters(dir: &Path) -> MemoryDocument {
    MemoryDocument::new(
        &dir.join("book.epub"),
        vec![
            numbered_chapter("one", 25),
            numbered_chapter("two", 12),
            numbered_chapter("three", 5),
        ],
    )
}

fn app_in(doc: MemoryDocument) -> App<MemoryDocument, LinesLayout> {
    let mut pager = Pager::new(false, Duration::ZERO);
    pager.set_viewport(40, 10);
    App::new(doc, LinesLayout, pager)
}

#[test]
fn forward_pages_then_moves_to_next_chapter() {
    let dir = TempDir::new().unwrap();
    let mut app = app_in(three_chapters(dir.path()));
    app.start().unwrap();
    assert_eq!((app.chapter(), app.pager().scroll_y()), (0, 0));

    app.dispatch(Action::Forward).unwrap();
    assert_eq!(app.pager().scroll_y(), 10);
    app.dispatch(Action::Forward).unwrap();
    assert_eq!(app.pager().scroll_y(), 15);
    app.dispatch(Action::Forward).unwrap();
    assert_eq!((app.chapter(), app.pager().scroll_y()), (1, 0));
}

#[test]
fn back_from_chapter_top_lands_on_previous_bottom() {
    let dir = TempDir::new().unwrap();
    let mut app = app_in(three_chapters(dir.path()));
    app.start().unwrap();
    app.dispatch(Action::NextChapter).unwrap();
    assert_eq!(app.chapter(), 1);

    app.dispatch(Action::Back).unwrap();
    assert_eq!(app.chapter(), 0);
    // 25 rows in pages of 10: the last page boundary is row 20, drawn as 15
    assert_eq!(app.pager().scroll_y(), 20);
    let mut terminal = create_test_terminal(40, 10);
    app.pager_mut().draw(&mut terminal).unwrap();
    assert_eq!(app.pager().scroll_y(), 15);
    assert!(capture_terminal_state(&terminal).ends_with("one 24"));
}

#[test]
fn back_inside_first_page_snaps_to_top_before_leaving() {
    let dir = TempDir::new().unwrap();
    let mut app = app_in(three_chapters(dir.path()));
    let mut terminal = create_test_terminal(40, 10);
    app.start().unwrap();
    app.dispatch(Action::NextChapter).unwrap();

    let events = TestScenarioBuilder::new()
        .scroll_down(2)
        .page_back()
        .into_input_events();
    for event in events {
        app.handle_event(event, &mut terminal).unwrap();
    }
    assert_eq!((app.chapter(), app.pager().scroll_y()), (1, 0));

    let events = TestScenarioBuilder::new().page_back().into_input_events();
    for event in events {
        app.handle_event(event, &mut terminal).unwrap();
    }
    assert_eq!((app.chapter(), app.pager().scroll_y()), (0, 20));
}

#[test]
fn resize_changes_page_height() {
    let dir = TempDir::new().unwrap();
    let mut app = app_in(three_chapters(dir.path()));
    let mut terminal = create_test_terminal(40, 10);
    app.start().unwrap();
    assert!(!app.pager().is_compact());
    assert_eq!(app.pager().doc().height(), 25);

    app.handle_event(InputEvent::Resize(30, 4), &mut terminal)
        .unwrap();
    assert_eq!(app.pager().viewport(), (30, 4));

    let events = TestScenarioBuilder::new()
        .press_key(KeyCode::Down)
        .page_forward()
        .into_input_events();
    for event in events {
        app.handle_event(event, &mut terminal).unwrap();
    }
    assert_eq!(app.pager().scroll_y(), 5);
    assert_eq!(app.marks().current().scroll_y, 5);
}

#[test]
fn chapter_edges_are_no_ops() {
    let dir = TempDir::new().unwrap();
    let mut app = app_in(three_chapters(dir.path()));
    app.start().unwrap();

    app.dispatch(Action::PrevChapter).unwrap();
    app.dispatch(Action::Back).unwrap();
    assert_eq!((app.chapter(), app.pager().scroll_y()), (0, 0));

    app.dispatch(Action::NextChapter).unwrap();
    app.dispatch(Action::NextChapter).unwrap();
    app.dispatch(Action::NextChapter).unwrap();
    assert_eq!(app.chapter(), 2);

    // five rows fit in one page, so forward has nowhere to go
    app.dispatch(Action::Forward).unwrap();
    assert_eq!((app.chapter(), app.pager().scroll_y()), (2, 0));
}

#[test]
fn chapter_jumps_reset_horizontal_offset() {
    let dir = TempDir::new().unwrap();
    let wide = "x".repeat(60);
    let doc = MemoryDocument::new(
        &dir.path().join("book.epub"),
        vec![wide.clone(), wide],
    );
    let mut app = app_in(doc);
    app.start().unwrap();

    app.dispatch(Action::ScrollRight).unwrap();
    app.dispatch(Action::ScrollRight).unwrap();
    assert_eq!(app.pager().scroll_x(), -2);
    app.dispatch(Action::NextChapter).unwrap();
    assert_eq!(app.pager().scroll_x(), 0);
}

#[test]
fn failed_chapter_load_is_fatal_and_keeps_position() {
    let dir = TempDir::new().unwrap();
    let mut app = app_in(three_chapters(dir.path()).failing_on(1));
    app.start().unwrap();
    app.dispatch(Action::Forward).unwrap();

    let err = app.dispatch(Action::NextChapter).unwrap_err();
    assert!(matches!(err, ReaderError::ChapterLoad { index: 1, .. }));
    assert_eq!(app.chapter(), 0);
    assert_eq!(app.pager().scroll_y(), 10);
}

#[test]
fn layout_failure_is_malformed_chapter() {
    let dir = TempDir::new().unwrap();
    let doc = MemoryDocument::new(&dir.path().join("book.epub"), vec![String::new()]);
    let pager = Pager::new(false, Duration::ZERO);
    let mut app = App::with_mark_store(
        doc,
        BrokenLayout,
        pager,
        MarkStore::new(dir.path().join(".book.epub.mark")),
    );
    let err = app.start().unwrap_err();
    assert!(matches!(err, ReaderError::MalformedChapter { index: 0, .. }));
}

struct BrokenLayout;

impl gridreader::Layout for BrokenLayout {
    fn layout(
        &self,
        _markup: &[u8],
        _manifest: &[gridreader::document::ManifestItem],
    ) -> Result<gridreader::CellBuffer, gridreader::layout::LayoutError> {
        Err(gridreader::layout::LayoutError::MalformedMarkup(
            "unexpected end of input".to_string(),
        ))
    }
}
