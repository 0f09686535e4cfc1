// src/store.rs
use crate::error::{StoreError, StoreResult};
use crate::models::{apply_patch, Account, AccountPatch};
use crate::storage::KeyValueStorage;
use crate::validation::{validate_account, ValidationError};
use log;

/// Storage key holding the JSON array of accounts.
pub const STORAGE_KEY: &str = "accounts_v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet; the list was left as it was.
    Missing,
    Loaded { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The merged record is valid and the whole list was written to storage.
    Persisted,
    /// The merged record is visible in memory but storage was left untouched.
    Invalid(Vec<ValidationError>),
    NotFound,
}

/// Owns the account list and mirrors valid state into a [`KeyValueStorage`].
///
/// Constructed once at startup with [`AccountStore::init`] and handed to the UI layer.
pub struct AccountStore<S: KeyValueStorage> {
    accounts: Vec<Account>,
    storage: S,
}

impl<S: KeyValueStorage> AccountStore<S> {
    /// Builds an empty store on top of `storage` without reading from it.
    pub fn new(storage: S) -> Self {
        AccountStore { accounts: Vec::new(), storage }
    }

    /// Builds the store and immediately loads prior state.
    ///
    /// A failed load is logged and handed back for diagnostics; the store is usable either way.
    pub fn init(storage: S) -> (Self, StoreResult<LoadOutcome>) {
        let mut store = Self::new(storage);
        let outcome = store.load();
        (store, outcome)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn get(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Replaces the in-memory list with the stored one. On any failure the list is left unchanged.
    pub fn load(&mut self) -> StoreResult<LoadOutcome> {
        log::info!("Loading accounts from storage key '{}'", STORAGE_KEY);
        let raw = match self.storage.get_item(STORAGE_KEY) {
            Ok(Some(raw)) if !raw.trim().is_empty() => raw,
            Ok(_) => {
                log::info!("No stored accounts found under '{}'. Starting empty.", STORAGE_KEY);
                return Ok(LoadOutcome::Missing);
            }
            Err(e) => {
                log::error!("Failed to read stored accounts: {}", e);
                return Err(e);
            }
        };

        match serde_json::from_str::<Vec<Account>>(&raw) {
            Ok(accounts) => {
                let count = accounts.len();
                self.accounts = accounts;
                log::info!("Loaded {} accounts.", count);
                Ok(LoadOutcome::Loaded { count })
            }
            Err(e) => {
                let msg = format!("Stored accounts under '{}' are malformed: {}", STORAGE_KEY, e);
                log::error!("load: {}", msg);
                Err(StoreError::Deserialization(msg))
            }
        }
    }

    /// Writes the full list, overwriting prior content.
    pub fn persist(&mut self) -> StoreResult<()> {
        let serialized = serde_json::to_string(&self.accounts).map_err(|e| {
            let msg = format!("JSON serialization failed: {}", e);
            log::error!("persist: {}", msg);
            StoreError::Serialization(msg)
        })?;
        self.storage.set_item(STORAGE_KEY, &serialized)?;
        log::debug!("Persisted {} accounts.", self.accounts.len());
        Ok(())
    }

    /// Appends a blank `Local` record and returns its id. Nothing is persisted:
    /// the blank record cannot pass validation yet.
    pub fn add_empty(&mut self) -> String {
        let account = Account::new_empty();
        let id = account.id.clone();
        self.accounts.push(account);
        log::info!("Added empty account {}", id);
        id
    }

    /// Drops the record with `id` (if any) and persists the remaining list.
    pub fn remove(&mut self, id: &str) -> StoreResult<bool> {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.id != id);
        let removed = self.accounts.len() != before;
        if removed {
            log::info!("Removed account {}", id);
        } else {
            log::debug!("remove: no account with id {}", id);
        }
        self.persist()?;
        Ok(removed)
    }

    /// Merges `patch` into the record with `id`.
    ///
    /// The merged record always replaces the in-memory one. Storage is only
    /// written when the record validates.
    pub fn save_partial(&mut self, id: &str, patch: &AccountPatch) -> StoreResult<SaveOutcome> {
        let Some(index) = self.accounts.iter().position(|a| a.id == id) else {
            log::debug!("save_partial: no account with id {}", id);
            return Ok(SaveOutcome::NotFound);
        };

        let updated = apply_patch(&self.accounts[index], patch);
        let validation = validate_account(&updated);
        self.accounts[index] = updated;

        match validation {
            Ok(()) => {
                self.persist()?;
                log::debug!("Account {} updated and persisted.", id);
                Ok(SaveOutcome::Persisted)
            }
            Err(errors) => {
                log::debug!("Account {} updated in memory only: {:?}", id, errors);
                Ok(SaveOutcome::Invalid(errors))
            }
        }
    }

    /// Flips the display-only password visibility flag. Never touches storage.
    pub fn set_show_password(&mut self, id: &str, visible: bool) -> bool {
        match self.accounts.iter_mut().find(|a| a.id == id) {
            Some(account) => {
                account.show_password = visible;
                true
            }
            None => false,
        }
    }
}
