//! Template rendering against the live process environment.
//!
//! The renderer is the seam between the mirror and whatever produces the
//! bytes a consumer reads. The production implementation substitutes
//! `${VAR}` and `$VAR` references with the value of the corresponding
//! environment variable *at render time*, so every read observes the
//! current environment rather than a snapshot.

use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::sync::LazyLock;

use regex::bytes::{Captures, Regex};
use thiserror::Error;

/// Errors from rendering a file's content.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to render template: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders raw file bytes into the content a consumer should see.
///
/// Implementations must be synchronous and side-effect free on the
/// filesystem; a failure terminates only the channel that invoked it.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, input: &[u8]) -> Result<Vec<u8>, RenderError>;
}

/// Matches `${NAME}` and bare `$NAME` references. Names follow shell
/// identifier rules, so `$5` or `$-` pass through untouched.
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("variable reference pattern is valid")
});

/// Environment-variable substitution with envsubst semantics.
///
/// Unset variables expand to the empty string. Bytes outside variable
/// references pass through untouched, including non-UTF-8 sequences.
#[derive(Debug, Default)]
pub struct EnvRenderer;

impl EnvRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for EnvRenderer {
    fn render(&self, input: &[u8]) -> Result<Vec<u8>, RenderError> {
        let rendered = VAR_PATTERN.replace_all(input, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_bytes())
                .unwrap_or_default();
            // The pattern only matches ASCII identifiers.
            let name = std::ffi::OsStr::from_bytes(name);
            std::env::var_os(name)
                .map(|value| value.into_vec())
                .unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_var(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_var(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    #[test]
    fn substitutes_braced_reference() {
        set_var("ENVMIRROR_TEST_PORT", "8080");
        let out = EnvRenderer::new()
            .render(b"PORT=${ENVMIRROR_TEST_PORT}\n")
            .unwrap();
        assert_eq!(out, b"PORT=8080\n");
        remove_var("ENVMIRROR_TEST_PORT");
    }

    #[test]
    fn substitutes_bare_reference() {
        set_var("ENVMIRROR_TEST_HOST", "db.local");
        let out = EnvRenderer::new()
            .render(b"host = $ENVMIRROR_TEST_HOST;")
            .unwrap();
        assert_eq!(out, b"host = db.local;");
        remove_var("ENVMIRROR_TEST_HOST");
    }

    #[test]
    fn unset_variable_expands_empty() {
        remove_var("ENVMIRROR_TEST_MISSING");
        let out = EnvRenderer::new()
            .render(b"value=${ENVMIRROR_TEST_MISSING}!")
            .unwrap();
        assert_eq!(out, b"value=!");
    }

    #[test]
    fn rendering_tracks_environment_changes() {
        set_var("ENVMIRROR_TEST_LIVE", "one");
        let renderer = EnvRenderer::new();
        assert_eq!(renderer.render(b"${ENVMIRROR_TEST_LIVE}").unwrap(), b"one");
        set_var("ENVMIRROR_TEST_LIVE", "two");
        assert_eq!(renderer.render(b"${ENVMIRROR_TEST_LIVE}").unwrap(), b"two");
        remove_var("ENVMIRROR_TEST_LIVE");
    }

    #[test]
    fn non_references_pass_through() {
        let input: &[u8] = b"cost: $5, flag: $-x, bytes: \xff\xfe, open ${ brace";
        let out = EnvRenderer::new().render(input).unwrap();
        assert_eq!(out, input);
    }
}
