//! Single-file transform for hosts with no plugin system

use super::Backend;
use crate::{ConfigError, Options, Outcome, Pipeline, TransformError, TransformOutput};

#[derive(Debug, Clone)]
pub struct StandaloneTransform {
    pipeline: Pipeline,
}

impl StandaloneTransform {
    pub fn new(options: Options) -> Result<Self, ConfigError> {
        Ok(Self {
            pipeline: Pipeline::new(options)?,
        })
    }

    /// Transform one file; `None` when the file is filtered out or has
    /// nothing to change
    pub fn transform(&self, code: &str, id: &str) -> Result<Option<TransformOutput>, TransformError> {
        if !self.should_transform(id, code) {
            return Ok(None);
        }
        self.pipeline.transform(code, id)
    }

    /// Like [`StandaloneTransform::transform`], keeping the warnings of
    /// files that pass through unchanged
    pub fn run(&self, code: &str, id: &str) -> Result<Outcome, TransformError> {
        if !self.should_transform(id, code) {
            return Ok(Outcome::Unchanged(Vec::new()));
        }
        self.pipeline.run(code, id)
    }
}

impl Backend for StandaloneTransform {
    const NAME: &'static str = "typegpu-standalone";

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_and_filter() {
        let transform = StandaloneTransform::new(Options::default()).unwrap();
        let code = "const f = () => { 'kernel'; return 1; };";
        let output = transform.transform(code, "src/shader.ts").unwrap().unwrap();
        assert!(output.code.starts_with("const f = (($) =>"));
        assert!(transform.transform(code, "src/shader.css").unwrap().is_none());
    }

    #[test]
    fn test_run_reports_parse_warning() {
        let transform = StandaloneTransform::new(Options::default()).unwrap();
        let outcome = transform.run("function f( { 'kernel'; }", "src/f.ts").unwrap();
        assert!(matches!(&outcome, Outcome::Unchanged(w) if w[0].code == crate::W_PARSE));
        let filtered = transform.run("function f( { 'kernel'; }", "src/f.css").unwrap();
        assert!(filtered.diagnostics().is_empty());
    }

    #[test]
    fn test_query_suffix_ignored() {
        let transform = StandaloneTransform::new(Options::default()).unwrap();
        let code = "const f = () => { 'kernel'; return 1; };";
        assert!(transform.transform(code, "src/a.ts?worker").unwrap().is_some());
    }
}
