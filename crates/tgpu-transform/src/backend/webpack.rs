//! Loader for webpack and the esbuild family. Parses with our own parser.

use serde::Serialize;

use super::Backend;
use crate::{ConfigError, Diagnostic, Options, Outcome, Pipeline, TransformError};

/// Loader result; untouched files come back as-is without a map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderOutput {
    pub code: String,
    /// Serialized source map JSON
    pub map: Option<String>,
    /// For `this.emitWarning`
    pub warnings: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct WebpackLoader {
    pipeline: Pipeline,
}

impl WebpackLoader {
    pub fn new(options: Options) -> Result<Self, ConfigError> {
        Ok(Self {
            pipeline: Pipeline::new(options)?,
        })
    }

    pub fn load(&self, source: &str, resource_path: &str) -> Result<LoaderOutput, TransformError> {
        let untouched = |warnings| LoaderOutput {
            code: source.to_string(),
            map: None,
            warnings,
        };
        if !self.should_transform(resource_path, source) {
            return Ok(untouched(Vec::new()));
        }
        Ok(match self.pipeline.run(source, resource_path)? {
            Outcome::Transformed(output) => LoaderOutput {
                map: Some(output.map.to_json()),
                code: output.code,
                warnings: output.diagnostics,
            },
            Outcome::Unchanged(warnings) => untouched(warnings),
        })
    }
}

impl Backend for WebpackLoader {
    const NAME: &'static str = "typegpu-loader";

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceMap;

    #[test]
    fn test_map_is_json_string() {
        let loader = WebpackLoader::new(Options::default()).unwrap();
        let output = loader
            .load("export const f = (a) => { 'kernel'; return a; };", "src/f.js")
            .unwrap();
        assert!(output.code.contains("__TYPEGPU_META__"));
        let map: SourceMap = serde_json::from_str(output.map.as_deref().unwrap()).unwrap();
        assert_eq!(map.sources, ["src/f.js"]);
        assert_eq!(map.version, 3);
    }

    #[test]
    fn test_untouched_passthrough() {
        let loader = WebpackLoader::new(Options::default()).unwrap();
        let output = loader.load("export const x = 1;", "src/x.js").unwrap();
        assert_eq!(output.code, "export const x = 1;");
        assert!(output.map.is_none());
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_parse_warning_reaches_host() {
        let loader = WebpackLoader::new(Options::default()).unwrap();
        let source = "const f = () => { 'kernel'; return (; };";
        let output = loader.load(source, "src/broken.js").unwrap();
        assert_eq!(output.code, source);
        assert!(output.map.is_none());
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].code, crate::W_PARSE);
    }
}
