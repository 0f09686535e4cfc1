// src/tui.rs
use crate::config::Config;
use crate::error::{AppResult, StoreResult, TuiError};
use crate::models::{Account, AccountPatch, AccountType};
use crate::storage::KeyValueStorage;
use crate::store::{AccountStore, LoadOutcome, SaveOutcome};
use crate::validation::validate_account;

use arboard; // For clipboard
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};
use std::io::{stdout, Stdout};
use std::time::Duration;
use log;

const BASE_KEYS: &str = "(q) Quit | (j/k) Nav | (a) Add | (e) Edit | (d) Del | (v) Show pass | (c) Copy login | (x) Copy pass";

/// Columns of the account form, in tab order.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Field {
    Labels,
    Type,
    Login,
    Password,
}

impl Field {
    /// Next field in tab order. LDAP rows have no password column to visit.
    fn next(self, account_type: AccountType) -> Field {
        match self {
            Field::Labels => Field::Type,
            Field::Type => Field::Login,
            Field::Login if account_type == AccountType::Local => Field::Password,
            Field::Login | Field::Password => Field::Labels,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Labels => "labels",
            Field::Type => "type",
            Field::Login => "login",
            Field::Password => "password",
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Editing { account_id: String, field: Field },
}

pub struct App<S: KeyValueStorage> {
    should_quit: bool,
    store: AccountStore<S>,
    selected_index: Option<usize>,
    table_state: TableState,
    mask_passwords: bool,
    app_status: String,
    input_mode: InputMode,
    current_input_value: String,
}

impl<S: KeyValueStorage> App<S> {
    pub fn new(store: AccountStore<S>, mask_passwords: bool) -> Self {
        let mut app = App {
            should_quit: false,
            store,
            selected_index: None,
            table_state: TableState::default(),
            mask_passwords,
            app_status: String::new(),
            input_mode: InputMode::Normal,
            current_input_value: String::new(),
        };
        let count = app.store.accounts().len();
        if count > 0 {
            app.select(Some(0));
        }
        app
    }

    fn select(&mut self, index: Option<usize>) {
        self.selected_index = index;
        self.table_state.select(index);
    }

    fn selected_account(&self) -> Option<&Account> {
        self.selected_index.and_then(|i| self.store.accounts().get(i))
    }

    fn copy_to_clipboard(&mut self, content: String, field_name: &str) {
        match arboard::Clipboard::new() {
            Ok(mut clipboard) => match clipboard.set_text(content) {
                Ok(_) => {
                    self.app_status = format!("{} copied to clipboard!", field_name);
                    log::info!("Copied {} to clipboard.", field_name);
                }
                Err(err) => {
                    self.app_status = format!("Error copying {}: {}", field_name, err);
                    log::error!("Error setting clipboard text for {}: {}", field_name, err);
                }
            },
            Err(err) => {
                self.app_status = format!("Error initializing clipboard: {}", err);
                log::error!("Error initializing clipboard: {}", err);
            }
        }
    }

    pub fn on_key(&mut self, key_event: KeyEvent) {
        log::debug!("Key event received: {:?}", key_event);
        match self.input_mode.clone() {
            InputMode::Normal => self.on_key_normal(key_event.code),
            InputMode::Editing { account_id, field } => self.on_key_editing(key_event.code, account_id, field),
        }
    }

    fn on_key_normal(&mut self, key_code: KeyCode) {
        match key_code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('a') => {
                let id = self.store.add_empty();
                let last = self.store.accounts().len() - 1;
                self.select(Some(last));
                self.begin_editing(id, Field::Labels);
                self.app_status = "New account added. Fill in login and password to save it.".to_string();
            }
            KeyCode::Char('e') | KeyCode::Enter => match self.selected_account().map(|a| a.id.clone()) {
                Some(id) => {
                    self.begin_editing(id, Field::Labels);
                    self.app_status = "Editing... (Tab) Next field | (Enter/Esc) Done".to_string();
                }
                None => self.app_status = "No account selected to edit.".to_string(),
            },
            KeyCode::Char('d') => self.delete_selected(),
            KeyCode::Char('v') => {
                if let Some((id, visible)) = self.selected_account().map(|a| (a.id.clone(), a.show_password)) {
                    self.store.set_show_password(&id, !visible);
                }
            }
            KeyCode::Char('c') => match self.selected_account().map(|a| a.login.clone()) {
                Some(login) => self.copy_to_clipboard(login, "Login"),
                None => self.app_status = "No account selected to copy login.".to_string(),
            },
            KeyCode::Char('x') => match self.selected_account().map(|a| a.password.clone()) {
                Some(Some(password)) => self.copy_to_clipboard(password, "Password"),
                Some(None) => self.app_status = "LDAP accounts have no stored password.".to_string(),
                None => self.app_status = "No account selected to copy password.".to_string(),
            },
            _ => {}
        }
    }

    fn on_key_editing(&mut self, key_code: KeyCode, account_id: String, field: Field) {
        let account_type = match self.store.get(&account_id) {
            Some(account) => account.account_type,
            None => {
                // Row vanished underneath us; nothing left to edit.
                self.input_mode = InputMode::Normal;
                return;
            }
        };

        match (field, key_code) {
            (_, KeyCode::Esc) | (_, KeyCode::Enter) => {
                self.input_mode = InputMode::Normal;
                self.current_input_value.clear();
                log::info!("Finished editing account {}", account_id);
            }
            (_, KeyCode::Tab) => {
                self.begin_editing(account_id, field.next(account_type));
            }
            (Field::Type, KeyCode::Char(' ')) | (Field::Type, KeyCode::Left) | (Field::Type, KeyCode::Right) => {
                let patch = AccountPatch { account_type: Some(account_type.toggled()), ..Default::default() };
                self.save_field(&account_id, field, &patch);
            }
            (Field::Type, _) => {}
            (_, KeyCode::Char(c)) => {
                self.current_input_value.push(c);
                self.save_input(&account_id, field);
            }
            (_, KeyCode::Backspace) => {
                self.current_input_value.pop();
                self.save_input(&account_id, field);
            }
            _ => {}
        }
    }

    fn begin_editing(&mut self, account_id: String, field: Field) {
        self.current_input_value = match self.store.get(&account_id) {
            Some(account) => match field {
                Field::Labels => account.label_raw.clone(),
                Field::Login => account.login.clone(),
                Field::Password => account.password.clone().unwrap_or_default(),
                Field::Type => String::new(),
            },
            None => String::new(),
        };
        log::debug!("Editing field {} of account {}", field.name(), account_id);
        self.input_mode = InputMode::Editing { account_id, field };
    }

    fn save_input(&mut self, account_id: &str, field: Field) {
        let value = Some(self.current_input_value.clone());
        let patch = match field {
            Field::Labels => AccountPatch { label_raw: value, ..Default::default() },
            Field::Login => AccountPatch { login: value, ..Default::default() },
            Field::Password => AccountPatch { password: value, ..Default::default() },
            Field::Type => return,
        };
        self.save_field(account_id, field, &patch);
    }

    fn save_field(&mut self, account_id: &str, field: Field, patch: &AccountPatch) {
        let result: StoreResult<SaveOutcome> = self.store.save_partial(account_id, patch);
        self.app_status = match result {
            Ok(SaveOutcome::Persisted) => "Saved.".to_string(),
            Ok(SaveOutcome::Invalid(errors)) => {
                let reasons: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                format!("Not saved: {}", reasons.join("; "))
            }
            Ok(SaveOutcome::NotFound) => "Account no longer exists.".to_string(),
            Err(e) => {
                log::error!("Failed to save {} of account {}: {}", field.name(), account_id, e);
                format!("Failed to save: {}", e)
            }
        };
    }

    fn delete_selected(&mut self) {
        let Some((selected_idx, id)) = self.selected_index.zip(self.selected_account().map(|a| a.id.clone())) else {
            self.app_status = "No account selected to delete.".to_string();
            return;
        };

        match self.store.remove(&id) {
            Ok(_) => self.app_status = "Account deleted.".to_string(),
            Err(e) => {
                self.app_status = format!("Account removed, but saving failed: {}", e);
                log::error!("Failed to persist after removing {}: {}", id, e);
            }
        }

        let count = self.store.accounts().len();
        if count == 0 {
            self.select(None);
        } else if selected_idx >= count {
            self.select(Some(count - 1));
        } else {
            self.select(Some(selected_idx));
        }
    }

    fn move_selection(&mut self, delta: i32) {
        let count = self.store.accounts().len();
        if count == 0 {
            self.select(None);
            return;
        }
        let current = self.selected_index.unwrap_or(0) as i32;
        let new_index = (current + delta).clamp(0, count as i32 - 1);
        self.select(Some(new_index as usize));
    }
}

pub fn run_tui<S: KeyValueStorage>(storage: S, config: &Config) -> AppResult<()> {
    log::info!("Initializing TUI...");
    let (store, outcome) = AccountStore::init(storage);
    let initial_status = match &outcome {
        Ok(LoadOutcome::Loaded { count }) => format!("Loaded {} accounts.", count),
        Ok(LoadOutcome::Missing) => "No saved accounts yet.".to_string(),
        Err(e) => format!("Could not load saved accounts: {}", e),
    };
    let mut app = App::new(store, config.mask_passwords);
    app.app_status = initial_status;

    enable_raw_mode().map_err(|e| { log::error!("Failed to enable raw mode: {}", e); TuiError::Io(e) })?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|e| { log::error!("Failed to setup terminal screen: {}", e); TuiError::Io(e) })?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| { log::error!("Failed to create terminal: {}", e); TuiError::Io(e) })?;

    log::info!("Starting TUI application loop.");
    let res = run_app_loop(&mut terminal, &mut app);
    log::info!("TUI application loop finished.");

    disable_raw_mode().map_err(|e| { log::error!("Failed to disable raw mode: {}", e); TuiError::Io(e) })?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .map_err(|e| { log::error!("Failed to restore terminal screen: {}", e); TuiError::Io(e) })?;

    res?;
    log::info!("TUI shutdown complete.");
    Ok(())
}

fn run_app_loop<S: KeyValueStorage>(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App<S>) -> Result<(), TuiError> {
    while !app.should_quit {
        terminal.draw(|f| ui(f, app)).map_err(|e| { log::error!("Terminal draw error: {}", e); TuiError::Io(e) })?;

        if event::poll(Duration::from_millis(100)).map_err(|e| { log::error!("Event poll error: {}", e); TuiError::Io(e) })? {
            if let Event::Key(key_event) = event::read().map_err(|e| { log::error!("Event read error: {}", e); TuiError::Io(e) })? {
                if key_event.kind == KeyEventKind::Press {
                    app.on_key(key_event);
                }
            }
        }
    }
    Ok(())
}

/// Builds the table row for one account, highlighting invalid cells and the cell under edit.
fn account_row<'a, S: KeyValueStorage>(app: &'a App<S>, account: &'a Account) -> Row<'a> {
    let invalid_fields: Vec<&'static str> = match validate_account(account) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(|e| e.field()).collect(),
    };
    let editing_field = match &app.input_mode {
        InputMode::Editing { account_id, field } if *account_id == account.id => Some(*field),
        _ => None,
    };

    let password_text = match &account.password {
        None => String::new(),
        Some(p) if account.show_password || !app.mask_passwords => p.clone(),
        Some(p) => "*".repeat(p.chars().count()),
    };
    let texts = [
        (Field::Labels, account.label_raw.clone()),
        (Field::Type, account.account_type.to_string()),
        (Field::Login, account.login.clone()),
        (Field::Password, password_text),
    ];

    let cells = texts.into_iter().map(|(field, text)| {
        let mut style = Style::default();
        if invalid_fields.contains(&field.name()) {
            style = style.fg(Color::Red);
        }
        if editing_field == Some(field) {
            let shown = if field == Field::Type { format!("< {} >", text) } else { format!("{}▋", text) };
            return Cell::from(shown).style(style.fg(Color::Yellow).add_modifier(Modifier::BOLD));
        }
        Cell::from(text).style(style)
    });
    Row::new(cells.collect::<Vec<_>>())
}

fn draw_main_ui<S: KeyValueStorage>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.size());

    let table_area = chunks[0];
    let status_bar_area = chunks[1];

    let accounts_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Accounts ({})", app.store.accounts().len()));

    if app.store.accounts().is_empty() {
        let no_entries_text = Paragraph::new("No accounts yet. Press 'a' to add one.")
            .block(accounts_block).alignment(Alignment::Center).wrap(Wrap { trim: true });
        f.render_widget(no_entries_text, table_area);
    } else {
        let rows: Vec<Row> = app.store.accounts().iter().map(|a| account_row(app, a)).collect();
        let header = Row::new(vec!["Labels", "Type", "Login", "Password"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let widths = [
            Constraint::Percentage(30),
            Constraint::Length(9),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(accounts_block)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
            .highlight_symbol("> ");
        let mut table_state = app.table_state.clone();
        f.render_stateful_widget(table, table_area, &mut table_state);
        app.table_state = table_state;
    }

    let status_text = if app.input_mode == InputMode::Normal {
        format!("{} | {}", app.app_status, BASE_KEYS)
    } else {
        format!("{} | (Tab) Next field | (Space) Toggle type | (Enter/Esc) Done", app.app_status)
    };
    let status_paragraph = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
    f.render_widget(status_paragraph, status_bar_area);
}

fn ui<S: KeyValueStorage>(f: &mut Frame, app: &mut App<S>) {
    draw_main_ui(f, app);
}
