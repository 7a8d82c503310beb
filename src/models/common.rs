use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Localized text keyed by locale (`"en"`, `"de-DE"`, ...).
pub type LocalizedString = BTreeMap<String, String>;

/// Monetary amount in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub currency_code: String,
    pub cent_amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction_digits: Option<u32>,
}

impl Money {
    pub fn new(currency_code: impl Into<String>, cent_amount: i64) -> Self {
        Self {
            currency_code: currency_code.into(),
            cent_amount,
            fraction_digits: None,
        }
    }
}

/// Reference to another resource on the commerce platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub type_id: String,
    pub id: String,
}

/// Reference to a type by its key, used by custom types and interactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeKeyReference {
    pub key: String,
}

impl TypeKeyReference {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Picks the translation for `locale`, falling back to its language part
/// (`de` for `de-AT`) and then to the first available translation.
pub fn localized_value<'a>(text: &'a LocalizedString, locale: Option<&str>) -> Option<&'a str> {
    if let Some(locale) = locale {
        if let Some(value) = text.get(locale) {
            return Some(value.as_str());
        }
        if let Some((language, _)) = locale.split_once('-') {
            if let Some(value) = text.get(language) {
                return Some(value.as_str());
            }
        }
    }
    text.values()
        .find(|value| !value.trim().is_empty())
        .map(String::as_str)
}
