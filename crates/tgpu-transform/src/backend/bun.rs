//! Bun loader plugin
//!
//! Bun selects files with a single regex over the path, so only
//! extension-shaped include patterns can be expressed.

use serde::Serialize;

use super::Backend;
use crate::{ConfigError, Options, Pipeline, TransformError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BunOutput {
    /// Transformed code with the source map inlined
    pub contents: String,
    pub loader: &'static str,
}

#[derive(Debug, Clone)]
pub struct BunLoader {
    pipeline: Pipeline,
    extensions: Vec<String>,
}

impl BunLoader {
    pub fn new(options: Options) -> Result<Self, ConfigError> {
        let pipeline = Pipeline::new(options)?;
        let mut extensions: Vec<String> = Vec::new();
        for glob in pipeline.filter().include() {
            let Some(found) = glob.extensions() else {
                return Err(ConfigError::UnsupportedPattern {
                    backend: "bun".to_string(),
                    pattern: glob.as_str().to_string(),
                });
            };
            for extension in found {
                if !extensions.contains(&extension) {
                    extensions.push(extension);
                }
            }
        }
        Ok(Self {
            pipeline,
            extensions,
        })
    }

    /// The `filter` regex handed to `onLoad`
    pub fn filter(&self) -> String {
        let escaped: Vec<String> = self
            .extensions
            .iter()
            .map(|ext| ext.replace('.', "\\."))
            .collect();
        format!("\\.({})$", escaped.join("|"))
    }

    pub fn on_load(&self, path: &str, contents: &str) -> Result<Option<BunOutput>, TransformError> {
        if !self.should_transform(path, contents) {
            return Ok(None);
        }
        Ok(self.pipeline.transform(contents, path)?.map(|output| BunOutput {
            contents: format!("{}\n{}", output.code, output.map.inline_comment()),
            loader: loader_for(path),
        }))
    }
}

impl Backend for BunLoader {
    const NAME: &'static str = "typegpu-bun";

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

fn loader_for(path: &str) -> &'static str {
    let path = crate::glob::strip_query(path);
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("ts" | "mts" | "cts") => "ts",
        Some("tsx") => "tsx",
        Some("jsx") => "jsx",
        _ => "js",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let loader = BunLoader::new(Options::default()).unwrap();
        assert_eq!(loader.filter(), "\\.(js|jsx|ts|tsx|mjs|mts|cjs|cts)$");
    }

    #[test]
    fn test_rejects_path_patterns() {
        let err = BunLoader::new(Options {
            include: vec!["src/**/*.ts".to_string()],
            ..Options::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), "E-CONFIG-002");
        assert!(err.to_string().contains("`src/**/*.ts`"));
    }

    #[test]
    fn test_inline_map_and_loader() {
        let loader = BunLoader::new(Options::default()).unwrap();
        let output = loader
            .on_load("/app/k.tsx", "export const k = () => { 'kernel'; return 0; };")
            .unwrap()
            .unwrap();
        assert_eq!(output.loader, "tsx");
        let last = output.contents.lines().last().unwrap();
        assert!(last.starts_with("//# sourceMappingURL=data:application/json;charset=utf-8;base64,"));
        assert!(loader.on_load("/app/plain.ts", "export {};").unwrap().is_none());
    }
}
