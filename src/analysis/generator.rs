use crate::error::GenerationError;
use std::time::Duration;

/// One call to the text-generation backend
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Text-generation backend
///
/// Implementations own transport, authentication and retries. The pipeline
/// bounds every call with its own timeout.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `request`
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "backend"
    }
}

/// Call `generator` and give up after `timeout`
///
/// Blank completions are reported as [`GenerationError::EmptyResponse`].
pub async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    request: GenerationRequest,
    timeout: Duration,
) -> Result<String, GenerationError> {
    match tokio::time::timeout(timeout, generator.generate(request)).await {
        Ok(Ok(text)) if text.trim().is_empty() => Err(GenerationError::EmptyResponse),
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(GenerationError::Timeout(timeout.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait::async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    struct Slow;

    #[async_trait::async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_prompt: "system".to_string(),
            user_prompt: "user".to_string(),
            temperature: 0.1,
            max_output_tokens: 100,
        }
    }

    #[tokio::test]
    async fn test_passes_text_through() {
        let text = generate_with_timeout(&Fixed("analysis"), request(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(text, "analysis");
    }

    #[tokio::test]
    async fn test_blank_response_is_error() {
        let err = generate_with_timeout(&Fixed("  \n"), request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_times_out() {
        let err = generate_with_timeout(&Slow, request(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(_)));
    }

    #[test]
    fn test_default_name() {
        assert_eq!(Fixed("x").name(), "backend");
    }
}
