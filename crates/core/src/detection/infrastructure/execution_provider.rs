/// Return the preferred ONNX execution providers for the current platform.
///
/// ONNX Runtime falls back to CPU when a listed provider is unavailable.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn test_cpu_only_platforms_request_no_extra_providers() {
        assert!(preferred_execution_providers().is_empty());
    }

    #[test]
    #[cfg(any(target_os = "macos", target_os = "windows"))]
    fn test_accelerated_platforms_request_one_provider() {
        assert_eq!(preferred_execution_providers().len(), 1);
    }
}
