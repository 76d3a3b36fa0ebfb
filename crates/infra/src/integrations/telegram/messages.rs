//! Embedded message catalog with `{placeholder}` substitution.
//!
//! The core never owns message strings; it hands the sender a message id
//! plus parameters and the catalog renders them in the recipient's
//! language. Lookup falls back user language → English → the key itself,
//! so a missing translation degrades to something greppable instead of an
//! error.

use std::collections::HashMap;

use chime_domain::constants::DEFAULT_LANGUAGE;
use once_cell::sync::Lazy;
use tracing::warn;

static LOCALES: [(&str, &str); 3] = [
    ("en", include_str!("../../../locales/en.json")),
    ("ru", include_str!("../../../locales/ru.json")),
    ("es", include_str!("../../../locales/es.json")),
];

static CATALOG: Lazy<HashMap<&'static str, HashMap<String, String>>> = Lazy::new(|| {
    LOCALES
        .iter()
        .map(|(lang, raw)| {
            let table: HashMap<String, String> = serde_json::from_str(raw).unwrap_or_else(|err| {
                warn!(lang, error = %err, "invalid locale table; language disabled");
                HashMap::new()
            });
            (*lang, table)
        })
        .collect()
});

/// Render a catalog message in `language`, substituting `{name}`
/// placeholders from `params`. Unknown keys render as the key itself.
pub fn render(key: &str, language: &str, params: &[(&str, &str)]) -> String {
    let template = lookup(key, language).unwrap_or(key);

    let mut text = template.to_string();
    for (name, value) in params {
        text = text.replace(&format!("{{{name}}}"), value);
    }
    text
}

fn lookup(key: &str, language: &str) -> Option<&'static str> {
    CATALOG
        .get(language)
        .and_then(|table| table.get(key))
        .or_else(|| CATALOG.get(DEFAULT_LANGUAGE).and_then(|table| table.get(key)))
        .map(String::as_str)
}
