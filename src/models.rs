// src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountType {
    #[serde(rename = "LDAP")]
    Ldap,
    #[default]
    Local,
}

impl AccountType {
    pub fn toggled(self) -> Self {
        match self {
            AccountType::Ldap => AccountType::Local,
            AccountType::Local => AccountType::Ldap,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Ldap => write!(f, "LDAP"),
            AccountType::Local => write!(f, "Local"),
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ldap" => Ok(AccountType::Ldap),
            "local" => Ok(AccountType::Local),
            other => Err(format!("unknown account type '{}' (expected LDAP or Local)", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LabelItem {
    pub text: String,
}

/// One managed credential record, laid out exactly as it is stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub label_raw: String,
    pub labels: Vec<LabelItem>,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub login: String,
    pub password: Option<String>,
    // Display-only; written only when set and never validated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_password: bool,
}

impl Account {
    /// A blank `Local` record with a fresh id. Invalid until login and password are filled in.
    pub fn new_empty() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label_raw: String::new(),
            labels: Vec::new(),
            account_type: AccountType::Local,
            login: String::new(),
            password: Some(String::new()),
            show_password: false,
        }
    }

    pub fn label_texts(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.text.as_str()).collect()
    }
}

/// Field-level update for an account. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub label_raw: Option<String>,
    pub account_type: Option<AccountType>,
    pub login: Option<String>,
    pub password: Option<String>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        self.label_raw.is_none()
            && self.account_type.is_none()
            && self.login.is_none()
            && self.password.is_none()
    }
}

/// Splits raw label text on `;`, trimming each piece and dropping empty ones.
pub fn parse_labels(raw: &str) -> Vec<LabelItem> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| LabelItem { text: s.to_string() })
        .collect()
}

/// Merges `patch` over `current`, producing the candidate record.
///
/// Labels are re-derived only when the patch carries new raw label text.
/// An `LDAP` result never keeps a password, whatever the patch says.
pub fn apply_patch(current: &Account, patch: &AccountPatch) -> Account {
    let account_type = patch.account_type.unwrap_or(current.account_type);
    let (label_raw, labels) = match &patch.label_raw {
        Some(raw) => (raw.clone(), parse_labels(raw)),
        None => (current.label_raw.clone(), current.labels.clone()),
    };
    let password = match account_type {
        AccountType::Ldap => None,
        AccountType::Local => patch.password.clone().or_else(|| current.password.clone()),
    };

    Account {
        id: current.id.clone(),
        label_raw,
        labels,
        account_type,
        login: patch.login.clone().unwrap_or_else(|| current.login.clone()),
        password,
        show_password: current.show_password,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_account() -> Account {
        Account {
            id: "acc-1".to_string(),
            label_raw: "work".to_string(),
            labels: parse_labels("work"),
            account_type: AccountType::Local,
            login: "alice".to_string(),
            password: Some("secret".to_string()),
            show_password: false,
        }
    }

    #[test]
    fn test_parse_labels_trims_and_drops_empty() {
        let labels = parse_labels("a; b ;;c");
        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_labels_blank_input() {
        assert!(parse_labels("").is_empty());
        assert!(parse_labels(" ; ;  ").is_empty());
    }

    #[test]
    fn test_new_empty_is_local_and_blank() {
        let a = Account::new_empty();
        let b = Account::new_empty();
        assert_ne!(a.id, b.id);
        assert_eq!(a.account_type, AccountType::Local);
        assert!(a.login.is_empty());
        assert_eq!(a.password.as_deref(), Some(""));
        assert!(a.labels.is_empty() && a.label_raw.is_empty());
    }

    #[test]
    fn test_apply_patch_keeps_unpatched_fields() {
        let current = local_account();
        let patch = AccountPatch { login: Some("bob".to_string()), ..Default::default() };
        let updated = apply_patch(&current, &patch);
        assert_eq!(updated.login, "bob");
        assert_eq!(updated.password.as_deref(), Some("secret"));
        assert_eq!(updated.labels, current.labels);
        assert_eq!(updated.id, current.id);
    }

    #[test]
    fn test_apply_patch_reparses_labels() {
        let current = local_account();
        let patch = AccountPatch { label_raw: Some("x;y".to_string()), ..Default::default() };
        let updated = apply_patch(&current, &patch);
        assert_eq!(updated.label_raw, "x;y");
        assert_eq!(updated.label_texts(), vec!["x", "y"]);
    }

    #[test]
    fn test_apply_patch_ldap_drops_password() {
        let current = local_account();
        let patch = AccountPatch {
            account_type: Some(AccountType::Ldap),
            password: Some("ignored".to_string()),
            ..Default::default()
        };
        let updated = apply_patch(&current, &patch);
        assert_eq!(updated.account_type, AccountType::Ldap);
        assert_eq!(updated.password, None);
    }

    #[test]
    fn test_serialized_shape() {
        let mut account = local_account();
        account.show_password = true;
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["labelRaw"], "work");
        assert_eq!(json["labels"][0]["text"], "work");
        assert_eq!(json["type"], "Local");
        assert_eq!(json["showPassword"], true);

        account.show_password = false;
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("showPassword").is_none());

        let ldap = Account { account_type: AccountType::Ldap, password: None, ..local_account() };
        let json = serde_json::to_value(&ldap).unwrap();
        assert_eq!(json["type"], "LDAP");
        assert!(json["password"].is_null());
    }

    #[test]
    fn test_account_type_from_str() {
        assert_eq!("ldap".parse::<AccountType>().unwrap(), AccountType::Ldap);
        assert_eq!("Local".parse::<AccountType>().unwrap(), AccountType::Local);
        assert!("kerberos".parse::<AccountType>().is_err());
    }
}
