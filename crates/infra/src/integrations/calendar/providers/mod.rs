//! Calendar provider implementations and factory.

pub mod caldav;
pub mod google;

use std::sync::Arc;

use chime_core::calendar_ports::CalendarProvider;
use chime_core::ports::SettingsStore;
use chime_domain::{ProviderKind, Result};

pub use caldav::CalDavProvider;
pub use google::GoogleCalendarProvider;

/// Create a calendar provider instance for a kind.
pub fn create_provider(
    kind: ProviderKind,
    settings: Arc<dyn SettingsStore>,
) -> Arc<dyn CalendarProvider> {
    match kind {
        ProviderKind::Google => Arc::new(GoogleCalendarProvider::new(settings)),
        ProviderKind::CalDav => Arc::new(CalDavProvider::new(settings)),
    }
}

/// Create a calendar provider instance by name.
///
/// Fails with `ChimeError::InvalidInput` for unknown provider names.
pub fn create_provider_by_name(
    name: &str,
    settings: Arc<dyn SettingsStore>,
) -> Result<Arc<dyn CalendarProvider>> {
    Ok(create_provider(name.parse::<ProviderKind>()?, settings))
}

/// One adapter per known kind, for service construction.
pub fn create_all(settings: &Arc<dyn SettingsStore>) -> Vec<Arc<dyn CalendarProvider>> {
    ProviderKind::all()
        .into_iter()
        .map(|kind| create_provider(kind, Arc::clone(settings)))
        .collect()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct EmptySettings;

    #[async_trait]
    impl SettingsStore for EmptySettings {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn factory_selects_by_kind() {
        let settings: Arc<dyn SettingsStore> = Arc::new(EmptySettings);
        for kind in ProviderKind::all() {
            let provider = create_provider(kind, Arc::clone(&settings));
            assert_eq!(provider.kind(), kind);
        }
    }

    #[test]
    fn factory_rejects_unknown_names() {
        let settings: Arc<dyn SettingsStore> = Arc::new(EmptySettings);
        assert!(create_provider_by_name("outlook", settings).is_err());
    }

    #[test]
    fn create_all_covers_every_kind() {
        let settings: Arc<dyn SettingsStore> = Arc::new(EmptySettings);
        let providers = create_all(&settings);
        assert_eq!(providers.len(), ProviderKind::all().len());
    }
}
