//! Registry construction and bootstrap from provider configuration

#[cfg(test)]
mod tests {
    use llm_relay::config::ProviderConfig;
    use llm_relay::core::types::{Capability, CapabilitySet, ErrorKind};
    use llm_relay::{ProviderKind, ProviderRegistry, RegistryError};

    use crate::common::{ScriptedAdapter, fixtures};

    /// Test duplicate registration
    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut registry = ProviderRegistry::new();
        let first = ScriptedAdapter::new("p1", fixtures::chat());
        let second = ScriptedAdapter::new("p1", fixtures::chat_streaming());

        assert_eq!(registry.register("p1", first.as_adapter()).unwrap(), 1);
        let err = registry.register("p1", second.as_adapter()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateProvider(ref key) if key.as_str() == "p1"));

        // The original registration is untouched
        let entry = registry.entry("p1").unwrap();
        assert!(!entry.capabilities.supports(Capability::Streaming));
    }

    /// Test explicit replacement
    #[test]
    fn test_replace_swaps_adapter_in_place() {
        let mut registry = ProviderRegistry::new();
        registry.register("p1", ScriptedAdapter::new("p1", fixtures::chat()).as_adapter()).unwrap();
        registry.register("p2", ScriptedAdapter::new("p2", fixtures::chat()).as_adapter()).unwrap();

        let previous = registry
            .replace("p1", ScriptedAdapter::new("p1", fixtures::chat_streaming()).as_adapter())
            .unwrap();

        assert!(previous.is_some());
        assert_eq!(registry.count(), 2);
        let keys: Vec<&str> = registry.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["p1", "p2"]);
        assert!(registry.entry("p1").unwrap().capabilities.supports(Capability::Streaming));
    }

    /// Test adapter with no capabilities
    #[test]
    fn test_empty_capabilities_are_rejected() {
        let mut registry = ProviderRegistry::new();
        let adapter = ScriptedAdapter::new("broken", CapabilitySet::new([Capability::Chat], 0));

        let err = registry.register("broken", adapter.as_adapter()).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCapabilities { .. }));
        assert!(registry.is_empty());
    }

    /// Test blank provider key
    #[test]
    fn test_blank_key_is_rejected() {
        let mut registry = ProviderRegistry::new();
        let err = registry
            .register("  ", ScriptedAdapter::new("x", fixtures::chat()).as_adapter())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidKey));
    }

    /// Test lookup of an unregistered key
    #[test]
    fn test_lookup_of_unknown_key() {
        let registry = ProviderRegistry::new();
        assert!(matches!(registry.get("nope"), Err(RegistryError::ProviderNotFound(_))));
        assert!(!registry.contains("nope"));
    }

    /// Test listing order
    #[test]
    fn test_list_keeps_registration_order() {
        let mut registry = ProviderRegistry::new();
        for key in ["zeta", "alpha", "mid"] {
            registry.register(key, ScriptedAdapter::new(key, fixtures::chat()).as_adapter()).unwrap();
        }
        let listed: Vec<String> = registry.list().into_iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(listed, vec!["zeta", "alpha", "mid"]);
    }

    /// Test registry bootstrap from configuration
    #[tokio::test]
    async fn test_bootstrap_initializes_enabled_providers() {
        let mut disabled = ProviderConfig::new("llama", ProviderKind::Meta);
        disabled.enabled = false;
        let providers = vec![
            ProviderConfig::new("openai", ProviderKind::OpenAI).with_api_key("sk-test"),
            ProviderConfig::new("claude", ProviderKind::Anthropic).with_api_key("sk-ant-test"),
            ProviderConfig::new("gemini", ProviderKind::Google).with_api_key("AIza-test"),
            disabled,
        ];

        let registry = ProviderRegistry::from_config(&providers).await.unwrap();

        assert_eq!(registry.count(), 3);
        assert!(!registry.contains("llama"));
        let claude = registry.entry("claude").unwrap();
        assert!(claude.capabilities.supports(Capability::SystemPrompt));
        assert_eq!(claude.adapter.key().as_str(), "claude");
    }

    /// Test bootstrap with a missing credential
    #[tokio::test]
    async fn test_bootstrap_fails_on_missing_credentials() {
        let providers = vec![
            ProviderConfig::new("openai", ProviderKind::OpenAI).with_api_key("sk-test"),
            ProviderConfig::new("claude", ProviderKind::Anthropic)
                .with_api_key_env("LLM_RELAY_TEST_UNSET_ANTHROPIC_KEY"),
        ];

        let err = ProviderRegistry::from_config(&providers).await.unwrap_err();
        match err {
            RegistryError::Initialization { key, source } => {
                assert_eq!(key.as_str(), "claude");
                assert_eq!(source.kind, ErrorKind::ConfigError);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Test bootstrap with an unsupported base URL scheme
    #[tokio::test]
    async fn test_bootstrap_rejects_bad_base_url() {
        let providers = vec![
            ProviderConfig::new("openai", ProviderKind::OpenAI)
                .with_api_key("sk-test")
                .with_base_url("ftp://example.com"),
        ];

        let err = ProviderRegistry::from_config(&providers).await.unwrap_err();
        assert!(matches!(err, RegistryError::Initialization { .. }));
    }
}
