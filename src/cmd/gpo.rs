/*!
`outlook-gpo-configs` - FlexConfirmMail group policy settings.

Both scopes are read from the same key path, machine-wide first and then the
current user. The two reads are merged explicitly: a setting found for the
current user replaces the machine-wide one, anything else keeps the
machine-wide value.

Registry value -> setting:
  CountAllowSkip   -> CountdownAllowSkip (==1)
  CountEnabled     -> ShowCountdown (==1)
  CountSeconds     -> CountdownSeconds
  MainSkipIfNoExt  -> SkipConfirmationForInternalMail (==1)
  SafeBccEnabled   -> ConfirmMultipleRecipientDomains (==1)
  SafeBccThreshold -> MinConfirmMultipleRecipientDomainsCount
  TrustedDomains   -> FixedInternalDomains
  UnsafeDomains    -> BuiltInAttentionDomainsItems
  UnsafeFiles      -> BuiltInAttentionTermsItems

The `Locked` scope (`...\FlexConfirmMail\Locked`) is reserved and always
reported empty.
*/

use serde::Serialize;

use crate::platform::{PolicyKey, PolicyScope, PolicyStore};
use crate::utils::LogContext;

pub const DEFAULT_KEY_PATH: &str = r"SOFTWARE\Policies\FlexConfirmMail\Default";

/* ---- Settings read from one scope ---- */

/// Settings found in one scope; `None` means the value was not present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySettings {
    pub countdown_allow_skip: Option<bool>,
    pub show_countdown: Option<bool>,
    pub countdown_seconds: Option<u64>,
    pub skip_confirmation_for_internal_mail: Option<bool>,
    pub confirm_multiple_recipient_domains: Option<bool>,
    pub min_confirm_multiple_recipient_domains_count: Option<u64>,
    pub fixed_internal_domains: Option<Vec<String>>,
    pub built_in_attention_domains_items: Option<Vec<String>>,
    pub built_in_attention_terms_items: Option<Vec<String>>,
}

impl PolicySettings {
    pub fn read(key: &dyn PolicyKey, log: &LogContext) -> Self {
        let flag = |name: &str| found(log, name, key.integer(name)).map(|v| v == 1);
        let count = |name: &str| found(log, name, key.integer(name));
        let list = |name: &str| found(log, name, key.strings(name));
        Self {
            countdown_allow_skip: flag("CountAllowSkip"),
            show_countdown: flag("CountEnabled"),
            countdown_seconds: count("CountSeconds"),
            skip_confirmation_for_internal_mail: flag("MainSkipIfNoExt"),
            confirm_multiple_recipient_domains: flag("SafeBccEnabled"),
            min_confirm_multiple_recipient_domains_count: count("SafeBccThreshold"),
            fixed_internal_domains: list("TrustedDomains"),
            built_in_attention_domains_items: list("UnsafeDomains"),
            built_in_attention_terms_items: list("UnsafeFiles"),
        }
    }

    /// Per setting: the override when present, otherwise `self`.
    pub fn merge(self, overrides: PolicySettings) -> PolicySettings {
        PolicySettings {
            countdown_allow_skip: overrides.countdown_allow_skip.or(self.countdown_allow_skip),
            show_countdown: overrides.show_countdown.or(self.show_countdown),
            countdown_seconds: overrides.countdown_seconds.or(self.countdown_seconds),
            skip_confirmation_for_internal_mail: overrides
                .skip_confirmation_for_internal_mail
                .or(self.skip_confirmation_for_internal_mail),
            confirm_multiple_recipient_domains: overrides
                .confirm_multiple_recipient_domains
                .or(self.confirm_multiple_recipient_domains),
            min_confirm_multiple_recipient_domains_count: overrides
                .min_confirm_multiple_recipient_domains_count
                .or(self.min_confirm_multiple_recipient_domains_count),
            fixed_internal_domains: overrides
                .fixed_internal_domains
                .or(self.fixed_internal_domains),
            built_in_attention_domains_items: overrides
                .built_in_attention_domains_items
                .or(self.built_in_attention_domains_items),
            built_in_attention_terms_items: overrides
                .built_in_attention_terms_items
                .or(self.built_in_attention_terms_items),
        }
    }
}

fn found<T: std::fmt::Debug>(log: &LogContext, name: &str, value: Option<T>) -> Option<T> {
    match &value {
        Some(v) => log.debug(format!("Successfully got data of the value {name}: {v:?}")),
        None => log.debug(format!("Failed to get data of the value {name}")),
    }
    value
}

/// Read one scope; an unopenable key means every setting is absent.
pub fn read_scope(
    store: &dyn PolicyStore,
    scope: PolicyScope,
    key_path: &str,
    log: &LogContext,
) -> PolicySettings {
    log.debug(format!("Read GPO configs from {scope}\\{key_path}"));
    match store.open(scope, key_path) {
        Ok(key) => PolicySettings::read(key.as_ref(), log),
        Err(err) => {
            log.debug(err.to_string());
            PolicySettings::default()
        }
    }
}

/* ---- Response shape ---- */

/// Wire shape: each setting plus a `Has*` flag recording whether it was found.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyConfig {
    pub countdown_allow_skip: bool,
    pub has_countdown_allow_skip: bool,
    pub show_countdown: bool,
    pub has_show_countdown: bool,
    pub countdown_seconds: u64,
    pub has_countdown_seconds: bool,
    pub skip_confirmation_for_internal_mail: bool,
    pub has_skip_confirmation_for_internal_mail: bool,
    pub confirm_multiple_recipient_domains: bool,
    pub has_confirm_multiple_recipient_domains: bool,
    pub min_confirm_multiple_recipient_domains_count: u64,
    pub has_min_confirm_multiple_recipient_domains_count: bool,
    pub fixed_internal_domains: Vec<String>,
    pub has_fixed_internal_domains: bool,
    pub built_in_attention_domains_items: Vec<String>,
    pub has_built_in_attention_domains_items: bool,
    pub built_in_attention_terms_items: Vec<String>,
    pub has_built_in_attention_terms_items: bool,
}

impl From<PolicySettings> for PolicyConfig {
    fn from(s: PolicySettings) -> Self {
        PolicyConfig {
            has_countdown_allow_skip: s.countdown_allow_skip.is_some(),
            countdown_allow_skip: s.countdown_allow_skip.unwrap_or_default(),
            has_show_countdown: s.show_countdown.is_some(),
            show_countdown: s.show_countdown.unwrap_or_default(),
            has_countdown_seconds: s.countdown_seconds.is_some(),
            countdown_seconds: s.countdown_seconds.unwrap_or_default(),
            has_skip_confirmation_for_internal_mail: s
                .skip_confirmation_for_internal_mail
                .is_some(),
            skip_confirmation_for_internal_mail: s
                .skip_confirmation_for_internal_mail
                .unwrap_or_default(),
            has_confirm_multiple_recipient_domains: s.confirm_multiple_recipient_domains.is_some(),
            confirm_multiple_recipient_domains: s
                .confirm_multiple_recipient_domains
                .unwrap_or_default(),
            has_min_confirm_multiple_recipient_domains_count: s
                .min_confirm_multiple_recipient_domains_count
                .is_some(),
            min_confirm_multiple_recipient_domains_count: s
                .min_confirm_multiple_recipient_domains_count
                .unwrap_or_default(),
            has_fixed_internal_domains: s.fixed_internal_domains.is_some(),
            fixed_internal_domains: s.fixed_internal_domains.unwrap_or_default(),
            has_built_in_attention_domains_items: s.built_in_attention_domains_items.is_some(),
            built_in_attention_domains_items: s
                .built_in_attention_domains_items
                .unwrap_or_default(),
            has_built_in_attention_terms_items: s.built_in_attention_terms_items.is_some(),
            built_in_attention_terms_items: s.built_in_attention_terms_items.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct OutlookGpoConfigsResponse {
    #[serde(rename = "Default")]
    pub default: PolicyConfig,
    #[serde(rename = "Locked")]
    pub locked: PolicyConfig,
    pub error: String,
}

pub fn execute_outlook_gpo_configs(
    store: &dyn PolicyStore,
    log: &LogContext,
) -> OutlookGpoConfigsResponse {
    let machine = read_scope(store, PolicyScope::Machine, DEFAULT_KEY_PATH, log);
    let user = read_scope(store, PolicyScope::CurrentUser, DEFAULT_KEY_PATH, log);
    OutlookGpoConfigsResponse {
        default: machine.merge(user).into(),
        locked: PolicyConfig::default(),
        error: String::new(),
    }
}
