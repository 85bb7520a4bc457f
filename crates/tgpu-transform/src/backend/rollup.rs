//! Rollup, Rolldown and Vite plugin
//!
//! The host may hand over the ESTree it already parsed with `this.parse`;
//! otherwise the file is parsed here.

use serde::Serialize;
use serde_json::Value;

use super::Backend;
use crate::normalize::estree;
use crate::options::Enforce;
use crate::sourcemap::SourceMap;
use crate::{ConfigError, Options, Pipeline, TransformError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollupOutput {
    pub code: String,
    pub map: SourceMap,
}

#[derive(Debug, Clone)]
pub struct RollupPlugin {
    pipeline: Pipeline,
}

impl RollupPlugin {
    pub fn new(options: Options) -> Result<Self, ConfigError> {
        Ok(Self {
            pipeline: Pipeline::new(options)?,
        })
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Vite's `enforce`, passed through from the options
    pub fn enforce(&self) -> Option<Enforce> {
        self.pipeline.options().enforce
    }

    /// The `transform` hook. `ast` is the host's ESTree `Program`, if any.
    pub fn transform(
        &self,
        code: &str,
        id: &str,
        ast: Option<&Value>,
    ) -> Result<Option<RollupOutput>, TransformError> {
        if !self.should_transform(id, code) {
            return Ok(None);
        }
        let output = match ast {
            Some(ast) => {
                let program = estree::program(ast, code)?;
                self.pipeline.transform_program(code, id, &program)?
            }
            None => self.pipeline.transform(code, id)?,
        };
        Ok(output.map(|output| RollupOutput {
            code: output.code,
            map: output.map,
        }))
    }
}

impl Backend for RollupPlugin {
    const NAME: &'static str = "rollup-plugin-typegpu";

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
