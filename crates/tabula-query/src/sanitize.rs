use crate::InputTarget;

/// Caller-supplied gate for free-text and filter input.
///
/// Returning `Err(reason)` rejects the value before it reaches the query
/// state; `Ok(value)` may also rewrite it (trimming, case folding).
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, target: &InputTarget, value: &str) -> Result<String, String>;
}

impl<F> Sanitizer for F
where
    F: Fn(&InputTarget, &str) -> Result<String, String> + Send + Sync,
{
    fn sanitize(&self, target: &InputTarget, value: &str) -> Result<String, String> {
        self(target, value)
    }
}

/// Accepts everything unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSanitizer;

impl Sanitizer for NoopSanitizer {
    fn sanitize(&self, _target: &InputTarget, value: &str) -> Result<String, String> {
        Ok(value.to_string())
    }
}
