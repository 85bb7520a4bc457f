//! Babel plugin: works on the `File` AST Babel already parsed

use serde_json::Value;

use super::Backend;
use crate::normalize::babel;
use crate::{ConfigError, Options, Pipeline, TransformError, TransformOutput};

#[derive(Debug, Clone)]
pub struct BabelPlugin {
    pipeline: Pipeline,
}

impl BabelPlugin {
    pub fn new(options: Options) -> Result<Self, ConfigError> {
        Ok(Self {
            pipeline: Pipeline::new(options)?,
        })
    }

    /// Visit `ast` (a Babel `File` or `Program` for `code`)
    pub fn transform_file(
        &self,
        ast: &Value,
        code: &str,
        filename: &str,
    ) -> Result<Option<TransformOutput>, TransformError> {
        if !self.should_transform(filename, code) {
            return Ok(None);
        }
        let program = babel::file(ast, code)?;
        self.pipeline.transform_program(code, filename, &program)
    }
}

impl Backend for BabelPlugin {
    const NAME: &'static str = "typegpu";

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_directive_kernel_from_babel_ast() {
        let code = "g(() => { 'kernel'; });";
        let ast = json!({
            "type": "File", "start": 0, "end": 23,
            "program": {
                "type": "Program", "start": 0, "end": 23, "directives": [],
                "body": [{
                    "type": "ExpressionStatement", "start": 0, "end": 23,
                    "expression": {
                        "type": "CallExpression", "start": 0, "end": 22,
                        "callee": { "type": "Identifier", "start": 0, "end": 1, "name": "g" },
                        "arguments": [{
                            "type": "ArrowFunctionExpression", "start": 2, "end": 21,
                            "id": null, "generator": false, "async": false, "params": [],
                            "body": {
                                "type": "BlockStatement", "start": 8, "end": 21, "body": [],
                                "directives": [{
                                    "type": "Directive", "start": 10, "end": 19,
                                    "value": { "type": "DirectiveLiteral", "start": 10, "end": 18, "value": "kernel" }
                                }]
                            }
                        }]
                    }
                }]
            }
        });
        let plugin = BabelPlugin::new(Options::default()).unwrap();
        let output = plugin.transform_file(&ast, code, "a.js").unwrap().unwrap();
        let native = plugin.pipeline().transform(code, "a.js").unwrap().unwrap();
        assert_eq!(output.code, native.code);
        assert_eq!(output.kernels[0].ir.external_names, Vec::<String>::new());
    }

    #[test]
    fn test_excluded_file_is_left_alone() {
        let plugin = BabelPlugin::new(Options {
            exclude: vec!["**/vendor/**".to_string()],
            ..Options::default()
        })
        .unwrap();
        let ast = json!({ "type": "Program", "start": 0, "end": 0, "body": [] });
        assert!(plugin
            .transform_file(&ast, "'kernel'", "lib/vendor/a.js")
            .unwrap()
            .is_none());
    }
}
