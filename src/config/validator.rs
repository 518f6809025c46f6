//! Startup validation for loaded settings

use super::Settings;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate settings, collecting every problem instead of stopping at
    /// the first one.
    pub fn validate(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if settings.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }

        if settings.llm.model.trim().is_empty() {
            errors.push("llm.model must not be empty".to_string());
        }
        if let Some(base_url) = &settings.llm.base_url {
            if reqwest::Url::parse(base_url).is_err() {
                errors.push(format!("llm.base_url is not a valid URL: {}", base_url));
            }
        }

        if reqwest::Url::parse(&settings.search.base_url).is_err() {
            errors.push(format!(
                "search.base_url is not a valid URL: {}",
                settings.search.base_url
            ));
        }
        if settings.search.collection.trim().is_empty() {
            errors.push("search.collection must not be empty".to_string());
        }

        if reqwest::Url::parse(&settings.resy.base_url).is_err() {
            errors.push(format!(
                "resy.base_url is not a valid URL: {}",
                settings.resy.base_url
            ));
        }

        if settings.agent.max_iterations == 0 {
            errors.push("agent.max_iterations must be at least 1".to_string());
        }
        if settings.agent.cache_ttl_seconds == 0 {
            errors.push("agent.cache_ttl_seconds must be at least 1".to_string());
        }
        if settings.agent.truncate_keep == 0 {
            errors.push("agent.truncate_keep must be at least 1".to_string());
        }
        if settings.agent.system_prompt.trim().is_empty() {
            errors.push("agent.system_prompt must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
