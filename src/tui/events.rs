use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, size as terminal_size, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use std::time::Duration;

use crate::config::KeyBindings;
use crate::tui::app::{App, Mode, Tab};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{parse_key_binding, ParsedKeyBinding};

/// Restores the terminal on drop, including when unwinding from a panic.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

/// Key bindings from config, parsed once at startup.
#[derive(Debug, Clone)]
pub struct Keymap {
    pub quit: ParsedKeyBinding,
    pub list_up: ParsedKeyBinding,
    pub list_down: ParsedKeyBinding,
    pub tab_left: ParsedKeyBinding,
    pub tab_right: ParsedKeyBinding,
    pub tabs: [ParsedKeyBinding; 3],
    pub help: ParsedKeyBinding,
    pub toggle_task_status: ParsedKeyBinding,
    pub postpone: ParsedKeyBinding,
    pub generate_blog: ParsedKeyBinding,
    pub copy_post: ParsedKeyBinding,
    pub refresh: ParsedKeyBinding,
}

impl Keymap {
    pub fn from_config(bindings: &KeyBindings) -> Result<Self, TuiError> {
        let parse = |name: &str, value: &str| {
            parse_key_binding(value).map_err(|e| TuiError::KeyBindingError(format!("{name}: {e}")))
        };
        Ok(Self {
            quit: parse("quit", &bindings.quit)?,
            list_up: parse("list_up", &bindings.list_up)?,
            list_down: parse("list_down", &bindings.list_down)?,
            tab_left: parse("tab_left", &bindings.tab_left)?,
            tab_right: parse("tab_right", &bindings.tab_right)?,
            tabs: [
                parse("tab_1", &bindings.tab_1)?,
                parse("tab_2", &bindings.tab_2)?,
                parse("tab_3", &bindings.tab_3)?,
            ],
            help: parse("help", &bindings.help)?,
            toggle_task_status: parse("toggle_task_status", &bindings.toggle_task_status)?,
            postpone: parse("postpone", &bindings.postpone)?,
            generate_blog: parse("generate_blog", &bindings.generate_blog)?,
            copy_post: parse("copy_post", &bindings.copy_post)?,
            refresh: parse("refresh", &bindings.refresh)?,
        })
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Checked before entering the alternate screen so the message stays visible.
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}.",
            width, height, min_width, min_height
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    loop {
        app.check_status_message_timeout();

        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(area);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key_event) = event::read()? {
                // Press only; Windows also reports releases.
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                    break;
                }
            }
        }
    }

    guard.restore()?;
    Ok(())
}

/// Returns true when the user asked to quit.
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match app.ui.mode {
        Mode::PostponeReason => handle_reason_prompt(app, key_event),
        Mode::Help => {
            if key_event.code == KeyCode::Esc
                || app.keys.help.matches(key_event.code, key_event.modifiers)
            {
                app.toggle_help();
            }
            Ok(false)
        }
        Mode::View => handle_view_mode(app, key_event),
    }
}

fn handle_reason_prompt(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match key_event.code {
        KeyCode::Esc => app.cancel_postpone(),
        KeyCode::Enter => app.submit_postpone()?,
        KeyCode::Backspace => app.pop_reason_char(),
        KeyCode::Char(c) => app.push_reason_char(c),
        _ => {}
    }
    Ok(false)
}

fn handle_view_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let (code, modifiers) = (key_event.code, key_event.modifiers);
    let keys = app.keys.clone();

    if keys.quit.matches(code, modifiers) {
        return Ok(true);
    }
    if keys.help.matches(code, modifiers) {
        app.toggle_help();
    } else if keys.list_up.matches(code, modifiers) || code == KeyCode::Up {
        app.move_selection_up();
    } else if keys.list_down.matches(code, modifiers) || code == KeyCode::Down {
        app.move_selection_down();
    } else if keys.tab_left.matches(code, modifiers) {
        app.previous_tab();
    } else if keys.tab_right.matches(code, modifiers) {
        app.next_tab();
    } else if let Some(i) = keys.tabs.iter().position(|k| k.matches(code, modifiers)) {
        app.switch_tab(Tab::ALL[i]);
    } else if keys.refresh.matches(code, modifiers) {
        app.refresh()?;
    } else if app.ui.current_tab == Tab::Today {
        if keys.toggle_task_status.matches(code, modifiers) {
            app.toggle_selected_task()?;
        } else if keys.postpone.matches(code, modifiers) {
            app.begin_postpone();
        }
    } else if app.ui.current_tab == Tab::Reflection {
        if keys.generate_blog.matches(code, modifiers) {
            app.set_status_message("Generating post...");
            app.generate_blog()?;
        } else if keys.copy_post.matches(code, modifiers) {
            app.copy_post_to_clipboard();
        }
    }
    Ok(false)
}
