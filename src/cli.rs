// src/cli.rs
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Account, AccountPatch, AccountType};
use crate::storage::FileStorage;
use crate::store::{AccountStore, SaveOutcome};
use crate::validation::ValidationError;
use log;
use rpassword;

/// Manage LDAP and local account credentials from the terminal.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(arg_required_else_help = false)] // No subcommand launches the TUI
pub struct Cli {
    /// Directory holding the account storage (overrides the config file)
    #[clap(long, global = true, value_parser)]
    pub storage_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all stored accounts
    List {
        /// Print passwords in clear text
        #[clap(long)]
        show_passwords: bool,
    },
    /// Add a new account; it is only saved if login and password are valid
    Add {
        /// Semicolon-separated labels, e.g. "work; vpn"
        #[clap(short, long)]
        labels: Option<String>,
        /// Account type: LDAP or Local
        #[clap(short = 't', long = "type", default_value = "Local")]
        account_type: AccountType,
        #[clap(long)]
        login: String,
        /// Required for Local accounts, ignored for LDAP
        #[clap(long)]
        password: Option<String>,
    },
    /// Update fields of an existing account
    Edit {
        id: String,
        #[clap(short, long)]
        labels: Option<String>,
        #[clap(short = 't', long = "type")]
        account_type: Option<AccountType>,
        #[clap(long)]
        login: Option<String>,
        #[clap(long, conflicts_with = "prompt_password")]
        password: Option<String>,
        /// Read the new password from the terminal without echo
        #[clap(long)]
        prompt_password: bool,
    },
    /// Remove an account by id
    Remove {
        id: String,
    },
    /// Launch the Terminal User Interface (TUI)
    Tui {
        /// Throwaway session: accounts are kept in memory and never written to disk
        #[clap(long)]
        in_memory: bool,
    },
}

fn open_store(storage_dir: &Path) -> AccountStore<FileStorage> {
    let (store, outcome) = AccountStore::init(FileStorage::new(storage_dir));
    log::debug!("Opened account storage in {:?}", store.storage().dir());
    if let Err(e) = outcome {
        // The store stays usable with whatever it already held.
        log::warn!("Continuing without previously stored accounts: {}", e);
        eprintln!("Warning: could not load stored accounts ({}).", e);
    }
    store
}

fn describe_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

pub fn display_password(account: &Account, reveal: bool) -> String {
    match &account.password {
        None => "-".to_string(),
        Some(p) if reveal => p.clone(),
        Some(p) => "*".repeat(p.chars().count()),
    }
}

/// Clear text is shown when asked for, when masking is off, or when the row itself is unmasked.
fn reveal_password(account: &Account, show_passwords: bool, config: &Config) -> bool {
    show_passwords || !config.mask_passwords || account.show_password
}

fn format_account(account: &Account, reveal: bool) -> String {
    format!(
        "  {}  [{}] login: {}, password: {}, labels: {}",
        account.id,
        account.account_type,
        account.login,
        display_password(account, reveal),
        account.label_texts().join(", ")
    )
}

/// Handles the parsed CLI command against the store in `storage_dir`.
/// Returns `Ok(true)` if the TUI should run, `Ok(false)` if a CLI command was handled.
pub fn handle_cli_command(command: Option<Commands>, storage_dir: &Path, config: &Config) -> AppResult<bool> {
    log::debug!("Handling CLI command: {:?}", command);
    match command {
        Some(Commands::List { show_passwords }) => {
            log::info!("Executing 'list' command for storage in {:?}", storage_dir);
            let store = open_store(storage_dir);
            if store.accounts().is_empty() {
                println!("No accounts stored.");
            } else {
                println!("Accounts:");
                for account in store.accounts() {
                    println!("{}", format_account(account, reveal_password(account, show_passwords, config)));
                }
            }
            log::info!("Listed {} accounts.", store.accounts().len());
            Ok(false)
        }
        Some(Commands::Add { labels, account_type, login, password }) => {
            log::info!("Executing 'add' command for storage in {:?}", storage_dir);
            let mut store = open_store(storage_dir);
            let id = store.add_empty();
            let patch = AccountPatch {
                label_raw: labels,
                account_type: Some(account_type),
                login: Some(login),
                password,
            };
            match store.save_partial(&id, &patch)? {
                SaveOutcome::Persisted => {
                    println!("Added account {}.", id);
                    Ok(false)
                }
                SaveOutcome::Invalid(errors) => {
                    let msg = format!("Account not saved: {}", describe_errors(&errors));
                    log::warn!("add: {}", msg);
                    Err(AppError::Cli(msg))
                }
                SaveOutcome::NotFound => Err(AppError::Cli(format!("Newly added account {} vanished.", id))),
            }
        }
        Some(Commands::Edit { id, labels, account_type, login, password, prompt_password }) => {
            log::info!("Executing 'edit' command for account {}", id);
            let password = if prompt_password {
                let entered = rpassword::prompt_password("New password: ").map_err(|e| {
                    log::error!("Failed to read password: {}", e);
                    AppError::Cli(format!("Failed to read password: {}", e))
                })?;
                Some(entered)
            } else {
                password
            };
            let patch = AccountPatch { label_raw: labels, account_type, login, password };
            if patch.is_empty() {
                return Err(AppError::Cli("Nothing to update. Pass at least one field to change.".to_string()));
            }

            let mut store = open_store(storage_dir);
            match store.save_partial(&id, &patch)? {
                SaveOutcome::Persisted => {
                    println!("Updated account {}.", id);
                    Ok(false)
                }
                SaveOutcome::Invalid(errors) => {
                    let msg = format!("Changes not saved: {}", describe_errors(&errors));
                    log::warn!("edit: {}", msg);
                    Err(AppError::Cli(msg))
                }
                SaveOutcome::NotFound => Err(AppError::Cli(format!("No account with id {}.", id))),
            }
        }
        Some(Commands::Remove { id }) => {
            log::info!("Executing 'remove' command for account {}", id);
            let mut store = open_store(storage_dir);
            if store.remove(&id)? {
                println!("Removed account {}.", id);
            } else {
                println!("No account with id {}.", id);
            }
            Ok(false)
        }
        Some(Commands::Tui { in_memory }) => {
            log::info!("'tui' command given (in_memory: {}), preparing to launch TUI.", in_memory);
            Ok(true)
        }
        None => {
            log::info!("No CLI command given, preparing to launch TUI by default.");
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn stored_accounts(dir: &Path) -> Vec<Account> {
        AccountStore::init(FileStorage::new(dir)).0.accounts().to_vec()
    }

    #[test]
    fn test_parse_add_command() {
        let cli = Cli::parse_from(["accman-rs", "add", "--login", "bob", "--password", "pw", "-t", "ldap"]);
        match cli.command {
            Some(Commands::Add { account_type, login, .. }) => {
                assert_eq!(account_type, AccountType::Ldap);
                assert_eq!(login, "bob");
            }
            other => panic!("Expected Add, got {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_runs_tui() {
        let dir = tempdir().unwrap();
        let cli = Cli::parse_from(["accman-rs", "--storage-dir", dir.path().to_str().unwrap()]);
        assert_eq!(cli.storage_dir.as_deref(), Some(dir.path()));
        assert!(handle_cli_command(cli.command, dir.path(), &Config::default()).unwrap());
    }

    #[test]
    fn test_add_edit_remove_flow() {
        let dir = tempdir().unwrap();
        let add = Commands::Add {
            labels: Some("work; vpn".to_string()),
            account_type: AccountType::Local,
            login: "bob".to_string(),
            password: Some("hunter2".to_string()),
        };
        assert!(!handle_cli_command(Some(add), dir.path(), &Config::default()).unwrap());

        let accounts = stored_accounts(dir.path());
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].label_texts(), vec!["work", "vpn"]);
        let id = accounts[0].id.clone();

        let edit = Commands::Edit {
            id: id.clone(),
            labels: None,
            account_type: Some(AccountType::Ldap),
            login: None,
            password: None,
            prompt_password: false,
        };
        handle_cli_command(Some(edit), dir.path(), &Config::default()).unwrap();
        let accounts = stored_accounts(dir.path());
        assert_eq!(accounts[0].account_type, AccountType::Ldap);
        assert_eq!(accounts[0].password, None);

        handle_cli_command(Some(Commands::Remove { id }), dir.path(), &Config::default()).unwrap();
        assert!(stored_accounts(dir.path()).is_empty());
    }

    #[test]
    fn test_add_invalid_account_is_not_saved() {
        let dir = tempdir().unwrap();
        let add = Commands::Add {
            labels: None,
            account_type: AccountType::Local,
            login: "bob".to_string(),
            password: None,
        };
        match handle_cli_command(Some(add), dir.path(), &Config::default()) {
            Err(AppError::Cli(msg)) => assert!(msg.contains("Password is required")),
            other => panic!("Expected Cli error, got {:?}", other),
        }
        assert!(stored_accounts(dir.path()).is_empty());
    }

    #[test]
    fn test_edit_unknown_id() {
        let dir = tempdir().unwrap();
        let edit = Commands::Edit {
            id: "nope".to_string(),
            labels: None,
            account_type: None,
            login: Some("x".to_string()),
            password: None,
            prompt_password: false,
        };
        assert!(matches!(handle_cli_command(Some(edit), dir.path(), &Config::default()), Err(AppError::Cli(_))));
    }

    #[test]
    fn test_display_password_masking() {
        let mut account = Account::new_empty();
        account.password = Some("hunter2".to_string());
        assert_eq!(display_password(&account, false), "*******");
        assert_eq!(display_password(&account, true), "hunter2");
        account.password = Some("a-rather-long-password".to_string());
        assert_eq!(display_password(&account, false), "*".repeat(22));
        account.password = None;
        assert_eq!(display_password(&account, true), "-");
    }

    #[test]
    fn test_list_reveals_per_config_and_row_flag() {
        let mut account = Account::new_empty();
        account.password = Some("hunter2".to_string());
        let masked = Config::default();
        let unmasked = Config { mask_passwords: false, ..Config::default() };

        assert!(!reveal_password(&account, false, &masked));
        assert!(reveal_password(&account, true, &masked));
        assert!(reveal_password(&account, false, &unmasked));
        assert!(format_account(&account, reveal_password(&account, false, &unmasked)).contains("password: hunter2"));

        account.show_password = true;
        assert!(reveal_password(&account, false, &masked));

        let dir = tempdir().unwrap();
        let list = Commands::List { show_passwords: false };
        assert!(!handle_cli_command(Some(list), dir.path(), &unmasked).unwrap());
    }
}
