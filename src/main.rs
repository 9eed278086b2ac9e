mod event;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};

use event::{AppEvent, EventHandler, caps_lock_on};
use swiftype::app::{App, Command, Phase};
use swiftype::config::{Config, WORD_COUNT_PRESETS};
use swiftype::engine::tasks::TaskMode;
use swiftype::identity::Identity;
use swiftype::service::Credential;
use swiftype::service::http::HttpTestService;
use swiftype::store::sentence_cache::SentenceCache;
use swiftype::ui::components::results_view::ResultsView;
use swiftype::ui::components::typing_area::TypingArea;
use swiftype::ui::layout::{AppLayout, pack_hint_lines};
use swiftype::ui::line_input::{InputResult, LineInput};
use swiftype::ui::theme::Theme;

#[derive(Parser)]
#[command(name = "swiftype", version, about = "Terminal typing speed test")]
struct Cli {
    #[arg(short, long, help = "Number of words per test (10, 15 or 20)")]
    words: Option<usize>,

    #[arg(long, help = "Base URL of the typing test API")]
    api_url: Option<String>,

    #[arg(long, help = "Access token of a logged-in account")]
    token: Option<String>,

    #[arg(short, long, help = "Guest name to save results under")]
    name: Option<String>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, help = "Log file (defaults to the data directory)")]
    log_file: Option<PathBuf>,
}

struct Frontend {
    app: App,
    theme: Theme,
    name_input: Option<LineInput>,
    caps_lock: bool,
    should_quit: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.clone())?;

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("ignoring unreadable config: {e}");
        Config::default()
    });
    if let Some(words) = cli.words {
        config.word_count = words;
    }
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(token) = cli.token {
        config.access_token = Some(token);
    }
    if let Some(name) = cli.name {
        config.guest_name = name;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    config.validate();

    let identity = match &config.access_token {
        Some(token) => Identity::authenticated(Credential::new(token.as_str())),
        None => Identity::guest(&config.guest_name),
    };
    let service = HttpTestService::new(&config.api_base_url, config.request_timeout())?;
    info!(
        "starting: {} words, api {}, {}",
        config.word_count,
        service.base_url(),
        if identity.is_authenticated() { "authenticated" } else { "guest" }
    );

    let mut app = App::new(
        &config,
        identity,
        Arc::new(service),
        SentenceCache::new(),
        TaskMode::Threaded,
    );
    app.start();

    let mut frontend = Frontend {
        app,
        theme: Theme::load(&config.theme).unwrap_or_default(),
        name_input: None,
        caps_lock: false,
        should_quit: false,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Press/Release kinds plus lock-key state (for the Caps Lock warning)
    let keyboard_enhanced = execute!(
        io::stdout(),
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
        )
    )
    .is_ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(100));
    let result = run_app(&mut terminal, &mut frontend, &events);

    if keyboard_enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    frontend.app.shutdown(config.request_timeout());

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("swiftype")
            .join("swiftype.log")
    });
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    frontend: &mut Frontend,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, frontend))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(frontend, key, Instant::now()),
            AppEvent::Tick => {}
        }
        let had_name = !frontend.app.identity().guest_name().is_empty();
        frontend.app.poll(Instant::now());
        if had_name && frontend.app.identity().guest_name().is_empty() {
            persist_guest_name("");
        }

        if frontend.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(frontend: &mut Frontend, key: KeyEvent, now: Instant) {
    frontend.caps_lock = caps_lock_on(&key);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        frontend.should_quit = true;
        return;
    }

    if let Some(input) = frontend.name_input.as_mut() {
        match input.handle(key) {
            InputResult::Continue => {}
            InputResult::Submit => {
                let name = input.value().to_string();
                frontend.name_input = None;
                if frontend.app.set_guest_name(&name, now) {
                    persist_guest_name(frontend.app.identity().guest_name());
                } else {
                    warn!("guest name change rejected during a test");
                }
            }
            InputResult::Cancel => frontend.name_input = None,
        }
        return;
    }

    let app = &mut frontend.app;
    match key.code {
        KeyCode::Esc => frontend.should_quit = true,
        KeyCode::Tab => app.handle(Command::Retry, now),
        KeyCode::Left => cycle_word_count(app, -1, now),
        KeyCode::Right => cycle_word_count(app, 1, now),
        KeyCode::Char('g') if ctrl => {
            if !app.guest_name_locked() {
                frontend.name_input = Some(LineInput::new(app.identity().guest_name()));
            }
        }
        KeyCode::Char(' ') => app.handle(Command::Skip, now),
        KeyCode::Backspace => app.handle(Command::Backspace, now),
        KeyCode::Char(ch) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            app.handle(Command::Type(ch), now)
        }
        _ => {}
    }
}

/// Remember the guest name for the next run. Reloads the file so command line
/// overrides are not written back.
fn persist_guest_name(name: &str) {
    let saved = Config::load().and_then(|mut config| {
        config.guest_name = name.to_string();
        config.save()
    });
    if let Err(e) = saved {
        warn!("failed to save guest name: {e}");
    }
}

fn cycle_word_count(app: &mut App, step: isize, now: Instant) {
    let current = WORD_COUNT_PRESETS
        .iter()
        .position(|&n| n == app.word_count())
        .unwrap_or(0);
    let next = (current as isize + step).rem_euclid(WORD_COUNT_PRESETS.len() as isize) as usize;
    app.handle(Command::SelectWordCount(WORD_COUNT_PRESETS[next]), now);
}

fn render(frame: &mut ratatui::Frame, frontend: &Frontend) {
    let area = frame.area();
    let colors = &frontend.theme.colors;
    let app = &frontend.app;

    frame.render_widget(Block::default().style(Style::default().bg(colors.bg())), area);
    let layout = AppLayout::new(area);

    let header_style = Style::default().fg(colors.header_fg()).bg(colors.header_bg());
    let mut header = vec![
        Span::styled(" swiftype ", header_style.add_modifier(Modifier::BOLD)),
        Span::styled(" words: ", header_style),
    ];
    for preset in WORD_COUNT_PRESETS {
        let style = if preset == app.word_count() {
            header_style.fg(colors.accent()).add_modifier(Modifier::BOLD)
        } else {
            header_style.fg(colors.text_pending())
        };
        header.push(Span::styled(format!("{preset} "), style));
    }
    if frontend.caps_lock {
        header.push(Span::styled(
            " CAPS LOCK ",
            header_style
                .fg(colors.warning())
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(header)).style(header_style),
        layout.header,
    );

    frame.render_widget(render_identity(frontend), layout.identity);

    match app.phase() {
        Phase::Idle => {
            let text = if app.is_loading() { " Loading sentence..." } else { "" };
            frame.render_widget(
                Paragraph::new(text).style(Style::default().fg(colors.text_pending())),
                layout.main,
            );
        }
        Phase::Active => {
            if let Some(test) = app.test() {
                frame.render_widget(TypingArea::new(test, &frontend.theme), layout.main);
            }
        }
        Phase::Finished => {
            if let Some(result) = app.last_result() {
                frame.render_widget(ResultsView::new(result, &frontend.theme), layout.main);
            }
        }
        Phase::Error => {
            let message = app.error_message().unwrap_or_default();
            frame.render_widget(
                Paragraph::new(message)
                    .style(Style::default().fg(colors.error()))
                    .block(Block::bordered().border_style(Style::default().fg(colors.error())))
                    .wrap(Wrap { trim: true }),
                layout.main,
            );
        }
    }

    let hints: &[&str] = if frontend.name_input.is_some() {
        &["[Enter] save name", "[Esc] cancel"]
    } else {
        &[
            "[Space] next word",
            "[Tab] new test",
            "[\u{2190}/\u{2192}] words",
            "[Ctrl-G] guest name",
            "[Esc] quit",
        ]
    };
    let footer: Vec<Line> = pack_hint_lines(hints, layout.footer.width as usize)
        .into_iter()
        .map(|l| Line::from(Span::styled(l, Style::default().fg(colors.text_pending()))))
        .collect();
    frame.render_widget(Paragraph::new(footer), layout.footer);
}

fn render_identity(frontend: &Frontend) -> Paragraph<'_> {
    let colors = &frontend.theme.colors;
    let identity = frontend.app.identity();
    let dim = Style::default().fg(colors.text_pending());

    let line = if identity.is_authenticated() {
        Line::from(Span::styled(" Logged in, results are saved to your account", dim))
    } else if let Some(input) = &frontend.name_input {
        let (before, cursor, after) = input.render_parts();
        let cursor_style = Style::default()
            .fg(colors.text_cursor_fg())
            .bg(colors.text_cursor_bg());
        Line::from(vec![
            Span::styled(" Name: ", dim),
            Span::styled(before, Style::default().fg(colors.fg())),
            Span::styled(cursor.unwrap_or(' ').to_string(), cursor_style),
            Span::styled(after, Style::default().fg(colors.fg())),
        ])
    } else if identity.guest_name().is_empty() {
        Line::from(Span::styled(
            " Log in or enter a name to save your results",
            Style::default().fg(colors.warning()),
        ))
    } else {
        Line::from(vec![
            Span::styled(" Guest: ", dim),
            Span::styled(identity.guest_name(), Style::default().fg(colors.success())),
        ])
    };
    Paragraph::new(line)
}
