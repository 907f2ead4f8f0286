use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Import page size and item timeout are not 0
/// - Alias priority is non-empty and has no duplicates
/// - Scheduler interval is not 0 when the scheduler is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.import.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "import.page_size cannot be 0".to_string(),
        ));
    }

    if config.import.item_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "import.item_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.import.alias_priority.is_empty() {
        return Err(ConfigError::ValidationError(
            "import.alias_priority must list at least one identifier kind".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for kind in &config.import.alias_priority {
        if !seen.insert(*kind) {
            return Err(ConfigError::ValidationError(format!(
                "import.alias_priority lists {} more than once",
                kind
            )));
        }
    }

    if config.scheduler.enabled && config.scheduler.interval_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.interval_minutes cannot be 0 while the scheduler is enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::AliasKind;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_page_size_zero_fails() {
        let mut config = Config::default();
        config.import.page_size = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_item_timeout_zero_fails() {
        let mut config = Config::default();
        config.import.item_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_alias_priority_fails() {
        let mut config = Config::default();
        config.import.alias_priority.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_alias_priority_fails() {
        let mut config = Config::default();
        config.import.alias_priority = vec![AliasKind::Imdb, AliasKind::Tmdb, AliasKind::Imdb];
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("imdb"));
    }

    #[test]
    fn test_validate_zero_interval_only_matters_when_enabled() {
        let mut config = Config::default();
        config.scheduler.interval_minutes = 0;
        assert!(validate_config(&config).is_err());

        config.scheduler.enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
