use std::fs;
use std::path::Path;
use std::time::Duration;

use gridreader::bookmark::{MarkFile, mark_file_path};
use gridreader::inputs::{EventUnifier, HookSwitch, InputEvent};
use gridreader::test_utils::test_helpers::{
    LinesLayout, MemoryDocument, TestScenarioBuilder, capture_terminal_state,
    create_test_terminal, numbered_chapter,
};
use gridreader::{App, Pager, ReaderError};
use tempfile::TempDir;

fn book(dir: &Path) -> MemoryDocument {
    MemoryDocument::new(
        &dir.join("book.epub"),
        vec![numbered_chapter("one", 25), numbered_chapter("two", 12)],
    )
}

fn new_app(dir: &Path) -> App<MemoryDocument, LinesLayout> {
    App::new(book(dir), LinesLayout, Pager::new(false, Duration::ZERO))
}

fn read_marks(dir: &Path) -> MarkFile {
    let content = fs::read_to_string(mark_file_path(&dir.join("book.epub"))).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn run_events(app: &mut App<MemoryDocument, LinesLayout>, events: Vec<InputEvent>) -> Result<(), ReaderError> {
    let (tx, rx) = flume::unbounded();
    for event in events {
        tx.send(event).unwrap();
    }
    drop(tx);
    let mut terminal = create_test_terminal(40, 10);
    app.run(&mut terminal, &rx)
}

#[test]
fn every_move_is_persisted() {
    let dir = TempDir::new().unwrap();
    let mut app = new_app(dir.path());
    app.start().unwrap();

    let events = TestScenarioBuilder::new()
        .scroll_down(3)
        .wheel_down()
        .quit()
        .into_input_events();
    run_events(&mut app, events).unwrap();

    assert!(!app.is_running());
    assert_eq!(app.pager().scroll_y(), 4);
    let marks = read_marks(dir.path());
    assert_eq!((marks.chapter, marks.scroll_y), (0, 4));
    assert!(marks.marks.is_empty());
}

#[test]
fn named_mark_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut app = new_app(dir.path());
    app.start().unwrap();

    let mut events = TestScenarioBuilder::new().page_forward().into_input_events();
    events.push(InputEvent::Record("a".to_string()));
    events.extend(TestScenarioBuilder::new().press_char('F').into_input_events());
    events.push(InputEvent::Restore("a".to_string()));
    run_events(&mut app, events).unwrap();

    assert_eq!((app.chapter(), app.pager().scroll_y()), (0, 10));
    let marks = read_marks(dir.path());
    assert_eq!((marks.chapter, marks.scroll_y), (0, 10));
    let a = marks.marks["a"];
    assert_eq!((a.chapter, a.scroll_y), (0, 10));
}

#[test]
fn restarting_resumes_last_position() {
    let dir = TempDir::new().unwrap();
    {
        let mut app = new_app(dir.path());
        app.start().unwrap();
        let events = TestScenarioBuilder::new()
            .press_char('F')
            .scroll_down(2)
            .into_input_events();
        run_events(&mut app, events).unwrap();
        assert_eq!((app.chapter(), app.pager().scroll_y()), (1, 2));
    }

    let mut app = new_app(dir.path());
    app.start().unwrap();
    assert_eq!((app.chapter(), app.pager().scroll_y()), (1, 2));

    let mut terminal = create_test_terminal(40, 10);
    app.pager_mut().draw(&mut terminal).unwrap();
    let screen = capture_terminal_state(&terminal);
    assert!(screen.lines().next().unwrap().ends_with("two 02"));
}

#[test]
fn unknown_mark_falls_back_to_last_position() {
    let dir = TempDir::new().unwrap();
    let mut app = new_app(dir.path());
    app.start().unwrap();

    let mut events = TestScenarioBuilder::new().scroll_down(5).into_input_events();
    events.push(InputEvent::Restore("nope".to_string()));
    run_events(&mut app, events).unwrap();
    assert_eq!(app.pager().scroll_y(), 5);
}

#[test]
fn mark_past_last_chapter_is_clamped() {
    let dir = TempDir::new().unwrap();
    fs::write(
        mark_file_path(&dir.path().join("book.epub")),
        r#"{"chapter": 9, "scroll_y": 3, "marks": null}"#,
    )
    .unwrap();

    let mut app = new_app(dir.path());
    app.start().unwrap();
    assert_eq!((app.chapter(), app.pager().scroll_y()), (1, 3));
}

#[test]
fn corrupt_mark_file_starts_at_the_top() {
    let dir = TempDir::new().unwrap();
    fs::write(mark_file_path(&dir.path().join("book.epub")), "{chapter: ").unwrap();

    let mut app = new_app(dir.path());
    app.start().unwrap();
    assert_eq!((app.chapter(), app.pager().scroll_y()), (0, 0));
}

#[test]
fn notice_leaves_the_page_on_screen() {
    let dir = TempDir::new().unwrap();
    let mut app = new_app(dir.path());
    app.start().unwrap();

    let (tx, rx) = flume::unbounded();
    tx.send(InputEvent::Notice("global hook: on".to_string()))
        .unwrap();
    drop(tx);
    let mut terminal = create_test_terminal(40, 10);
    app.run(&mut terminal, &rx).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(!screen.contains("global hook"));
    assert!(screen.lines().next().unwrap().ends_with("one 00"));
}

#[test]
fn failed_input_source_ends_the_session() {
    let dir = TempDir::new().unwrap();
    let mut app = new_app(dir.path());
    app.start().unwrap();

    let err = run_events(&mut app, vec![InputEvent::SourceFailed("tty closed".to_string())])
        .unwrap_err();
    assert!(matches!(err, ReaderError::InputSource { .. }));
}

#[test]
fn scripted_terminal_drives_the_reader() {
    let dir = TempDir::new().unwrap();
    let mut app = new_app(dir.path());
    app.start().unwrap();

    let script = TestScenarioBuilder::new()
        .scroll_down(2)
        .page_forward()
        .scroll_up(1)
        .quit()
        .build();
    let unifier = EventUnifier::start(Box::new(script), None, HookSwitch::new(false), "123");
    let mut terminal = create_test_terminal(40, 10);
    app.run(&mut terminal, unifier.receiver()).unwrap();

    assert!(!app.is_running());
    assert_eq!(app.pager().scroll_y(), 11);
}

#[test]
fn terminal_keys_are_ignored_while_hook_is_on() {
    let dir = TempDir::new().unwrap();
    let mut app = new_app(dir.path());
    app.start().unwrap();

    let script = TestScenarioBuilder::new().scroll_down(4).build();
    let unifier = EventUnifier::start(Box::new(script), None, HookSwitch::new(true), "123");

    let mut terminal = create_test_terminal(40, 10);
    let (tx, rx) = flume::unbounded();
    tx.send(InputEvent::Wheel(2)).unwrap();
    drop(tx);
    app.run(&mut terminal, &rx).unwrap();
    assert_eq!(app.pager().scroll_y(), 2);

    // the terminal producer forwarded nothing
    assert!(unifier.receiver().try_recv().is_err());
    assert!(unifier.switch().is_enabled());
}
