use std::fs::File;
use std::io::{Stdout, stdout};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info, warn};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use gridreader::inputs::{EventUnifier, GlobalHook, HookSwitch, KeyboardEventSource};
use gridreader::panic_handler;
use gridreader::settings::{self, Overrides};
use gridreader::{App, EpubDocument, HtmlLayout, Pager, ReaderError};

const DEBUG_LOG_FILE: &str = "gridreader-debug.log";

const READING_KEYS: &str = "\
When reading:
  q, Esc           quit
  j, k             scroll down, up
  h, l             scroll left, right
  f, b             page forward, back (moves across chapters)
  F, B             next, previous chapter
  g, G             top, bottom of chapter
  mouse wheel      scroll down, up
  Ctrl + 1,2,3     toggle the global hook
  m + name         record mark (hold m, type name, release m)
  n + name         restore mark (hold n, type name, release n)";

#[derive(Parser, Debug)]
#[command(
    name = "gridreader",
    version,
    about = "Terminal pager for EPUB books",
    after_help = READING_KEYS
)]
struct Args {
    /// EPUB file to read
    document: PathBuf,

    /// Write a debug log next to the document
    #[arg(short, long)]
    debug: bool,

    /// Start with the system-wide key hook enabled
    #[arg(short, long)]
    global_hook: bool,

    /// Skip blank rows when drawing
    #[arg(long = "no-blank", visible_alias = "nb")]
    no_blank: bool,

    /// Layout width in columns
    #[arg(long, value_name = "COLS")]
    width: Option<usize>,
}

fn init_logging(document: &Path, debug: bool) -> Result<()> {
    if !debug {
        log::set_max_level(LevelFilter::Off);
        return Ok(());
    }
    let dir = document.parent().unwrap_or_else(|| Path::new(""));
    let path = dir.join(DEBUG_LOG_FILE);
    let file = File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
    WriteLogger::init(LevelFilter::Debug, Config::default(), file)?;
    Ok(())
}

fn setup_terminal() -> Result<(Terminal<CrosstermBackend<Stdout>>, (u16, u16)), ReaderError> {
    enable_raw_mode().map_err(ReaderError::TerminalInit)?;
    let init = || -> std::io::Result<_> {
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        let size = crossterm::terminal::size()?;
        Ok((terminal, size))
    };
    init().map_err(|e| {
        panic_handler::restore_terminal();
        ReaderError::TerminalInit(e)
    })
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(feature = "global-hook")]
fn global_hook() -> Option<Box<dyn GlobalHook>> {
    Some(Box::new(gridreader::inputs::hook::RdevHook))
}

#[cfg(not(feature = "global-hook"))]
fn global_hook() -> Option<Box<dyn GlobalHook>> {
    None
}

fn run(args: Args) -> Result<()> {
    init_logging(&args.document, args.debug)?;
    info!("Starting gridreader for {}", args.document.display());

    let settings = settings::load_settings().apply(&Overrides {
        compact: args.no_blank,
        global_hook: args.global_hook,
        layout_width: args.width,
    });
    info!("Effective settings: {settings:?}");

    let doc = EpubDocument::open(&args.document)?;
    let layout = HtmlLayout::new(settings.layout_width);
    let mut pager = Pager::new(settings.compact, settings.message_pause());

    let hook = global_hook();
    if settings.global_hook && hook.is_none() {
        warn!("global hook requested but this build has no hook backend");
    }
    let switch = HookSwitch::new(settings.global_hook && hook.is_some());

    let (mut terminal, (width, height)) = setup_terminal()?;
    pager.set_viewport(width, height);

    let unifier = EventUnifier::start(
        Box::new(KeyboardEventSource),
        hook,
        switch,
        &settings.toggle_sequence,
    );

    let mut app = App::new(doc, layout, pager);
    let result = app
        .start()
        .and_then(|()| app.run(&mut terminal, unifier.receiver()));

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {e}");
    }
    result?;

    info!("Shutting down gridreader");
    Ok(())
}

fn main() {
    panic_handler::initialize_panic_handler();
    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("Application error: {e:?}");
        eprintln!("Exit with error: {e:#}");
        std::process::exit(1);
    }
}
