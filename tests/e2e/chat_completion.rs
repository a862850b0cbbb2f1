//! Live chat completion through every vendor adapter

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use std::sync::Arc;

    use llm_relay::config::ProviderConfig;
    use llm_relay::{
        CompletionService, DispatchOptions, NormalizedRequest, ProviderKind, ProviderRegistry,
    };

    use crate::common::providers::get_api_key;
    use crate::skip_without_env;

    async fn service(key: &str, kind: ProviderKind, env: &str, model: &str) -> CompletionService {
        let mut provider = ProviderConfig::new(key, kind).with_api_key_env(env);
        provider.adapter.default_model = Some(model.to_string());
        let registry = ProviderRegistry::from_config(&[provider]).await.unwrap();
        CompletionService::with_registry(Arc::new(registry))
    }

    fn prompt() -> NormalizedRequest {
        NormalizedRequest::new("")
            .system("Answer with a single word.")
            .user("What color is the sky on a clear day?")
            .with_max_tokens(16)
    }

    async fn assert_live_chat(key: &str, kind: ProviderKind, env: &str, model: &str) {
        let service = service(key, kind, env, model).await;

        let response = service.submit(prompt(), DispatchOptions::new()).await.unwrap();
        assert_eq!(response.provider.as_str(), key);
        assert!(!response.text().unwrap_or_default().trim().is_empty());

        let mut stream = service.submit_stream(prompt(), DispatchOptions::new()).await.unwrap();
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk.unwrap().content());
        }
        assert!(!text.trim().is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_openai_chat() {
        skip_without_env!("OPENAI_API_KEY");
        assert_live_chat("openai", ProviderKind::OpenAI, "OPENAI_API_KEY", "gpt-4o-mini").await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_anthropic_chat() {
        skip_without_env!("ANTHROPIC_API_KEY");
        assert_live_chat(
            "anthropic",
            ProviderKind::Anthropic,
            "ANTHROPIC_API_KEY",
            "claude-3-5-haiku-latest",
        )
        .await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_gemini_chat() {
        skip_without_env!("GEMINI_API_KEY");
        assert_live_chat("gemini", ProviderKind::Google, "GEMINI_API_KEY", "gemini-1.5-flash").await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_meta_llama_chat() {
        skip_without_env!("LLAMA_API_KEY");
        assert_live_chat("llama", ProviderKind::Meta, "LLAMA_API_KEY", "Llama-3.3-70B-Instruct").await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_fallback_between_live_vendors() {
        let keys = ["OPENAI_API_KEY", "ANTHROPIC_API_KEY"];
        if keys.iter().any(|k| get_api_key(k).is_none()) {
            eprintln!("Skipping test: needs both OPENAI_API_KEY and ANTHROPIC_API_KEY");
            return;
        }

        // The first provider is given a bogus key, so the call must fall back
        let mut providers = vec![
            ProviderConfig::new("openai", ProviderKind::OpenAI).with_api_key("sk-invalid"),
            ProviderConfig::new("anthropic", ProviderKind::Anthropic).with_api_key_env("ANTHROPIC_API_KEY"),
        ];
        providers[0].adapter.default_model = Some("gpt-4o-mini".to_string());
        providers[1].adapter.default_model = Some("claude-3-5-haiku-latest".to_string());
        let registry = ProviderRegistry::from_config(&providers).await.unwrap();
        let service = CompletionService::with_registry(Arc::new(registry));

        let outcome = service
            .submit_with_outcome(prompt(), DispatchOptions::new())
            .await
            .unwrap();
        assert_eq!(outcome.provider.as_str(), "anthropic");
        assert!(outcome.used_fallback);
    }
}
