//! The per-file pipeline shared by every backend
//!
//! parse (or take a normalized AST), resolve aliases, detect kernel sites,
//! lower each one, splice the registrations back, emit code and a map.

use serde::Serialize;
use tgpu_ast::{LineCol, Program, Span};
use tgpu_lower::{lower, LowerOptions};
use tinyest::KernelIr;

use crate::context::FileContext;
use crate::detect::{detect, KernelKind, KernelSite, SiteForm};
use crate::diagnostics::{Diagnostic, W_CLASS, W_HOIST, W_OPERATOR, W_PARSE};
use crate::glob::FileFilter;
use crate::magic_string::{MagicString, Piece};
use crate::operators;
use crate::options::Options;
use crate::prune::may_contain_kernels;
use crate::sourcemap::SourceMap;
use crate::splice;
use crate::{ConfigError, TransformError};

/// One lowered kernel, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelReport {
    pub name: Option<String>,
    pub kind: KernelKind,
    pub ir: KernelIr,
    #[serde(skip)]
    pub span: Span,
    pub position: LineCol,
}

/// Result for a file that was changed
#[derive(Debug, Clone, Serialize)]
pub struct TransformOutput {
    pub code: String,
    pub map: SourceMap,
    pub kernels: Vec<KernelReport>,
    pub diagnostics: Vec<Diagnostic>,
}

/// What the pipeline made of one file
#[derive(Debug, Clone)]
pub enum Outcome {
    Transformed(TransformOutput),
    /// Nothing to change. Warnings, such as a parse failure, are kept.
    Unchanged(Vec<Diagnostic>),
}

impl Outcome {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Outcome::Transformed(output) => &output.diagnostics,
            Outcome::Unchanged(diagnostics) => diagnostics,
        }
    }

    pub fn into_output(self) -> Option<TransformOutput> {
        match self {
            Outcome::Transformed(output) => Some(output),
            Outcome::Unchanged(_) => None,
        }
    }
}

/// Validated options plus compiled filters
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: Options,
    filter: FileFilter,
}

impl Pipeline {
    pub fn new(options: Options) -> Result<Self, ConfigError> {
        options.validate()?;
        let filter = FileFilter::new(&options.include, &options.exclude)?;
        Ok(Self { options, filter })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    /// Include/exclude filter plus the early-prune scan
    pub fn should_transform(&self, id: &str, code: &str) -> bool {
        if !self.filter.matches(id) {
            return false;
        }
        if self.options.early_pruning
            && !may_contain_kernels(code, self.options.force_tgpu_alias.as_deref())
        {
            log::debug!("{}: pruned", id);
            return false;
        }
        true
    }

    /// Parse and transform `code`; `None` when nothing changed
    pub fn transform(&self, code: &str, id: &str) -> Result<Option<TransformOutput>, TransformError> {
        self.run(code, id).map(Outcome::into_output)
    }

    /// Transform `code` given its already parsed `program`
    pub fn transform_program(
        &self,
        code: &str,
        id: &str,
        program: &Program,
    ) -> Result<Option<TransformOutput>, TransformError> {
        self.run_program(code, id, program).map(Outcome::into_output)
    }

    /// Parse and transform `code`. Files that fail to parse are left alone
    /// with a warning.
    pub fn run(&self, code: &str, id: &str) -> Result<Outcome, TransformError> {
        match tgpu_parser::parse(code) {
            Ok(program) => self.run_program(code, id, &program),
            Err(err) => {
                let mut ctx = FileContext::new(id, code);
                ctx.diagnostics.warn(
                    W_PARSE,
                    format!("skipped, could not parse: {}", err),
                    id,
                    err.span(),
                    &ctx.line_index,
                );
                Ok(Outcome::Unchanged(ctx.diagnostics.into_vec()))
            }
        }
    }

    pub fn run_program(&self, code: &str, id: &str, program: &Program) -> Result<Outcome, TransformError> {
        let mut ctx = FileContext::new(id, code);
        if let Some(alias) = &self.options.force_tgpu_alias {
            ctx.add_alias(alias.clone());
        }
        ctx.resolve_aliases(program);

        let detection = detect(program, &ctx);
        log::debug!(
            "{}: {} kernel site(s), {} already registered",
            id,
            detection.sites.len(),
            detection.already_spliced
        );

        for (span, name) in &detection.class_members {
            ctx.diagnostics.warn(
                W_CLASS,
                format!(
                    "kernel directive on class member `{}` is ignored",
                    name.as_deref().unwrap_or(tgpu_lower::UNNAMED)
                ),
                id,
                *span,
                &ctx.line_index,
            );
        }

        let mut buffer = MagicString::new(code);
        let mut kernels = Vec::new();
        let mut needs_prelude = false;

        for site in &detection.sites {
            let ir = lower(
                site.function,
                &LowerOptions::new(id, &ctx.line_index)
                    .with_version(self.options.ir_version)
                    .with_kernel_name(site.name.as_deref())
                    .as_expression(site.form == SiteForm::Expression),
            )?;
            let function = self.host_function(code, site, &mut ctx, &mut needs_prelude);
            let wrapper = splice::registration(function, &ir, site.name.as_deref());
            if !splice::apply(&mut buffer, site, wrapper) {
                log::debug!("{}: kernel at {} overlaps another edit", id, site.span.start);
                continue;
            }
            self.warn_hoisting(program, site, &mut ctx);
            log::trace!(
                "{}: registered {} with externals {:?}",
                id,
                site.name.as_deref().unwrap_or(tgpu_lower::UNNAMED),
                ir.external_names
            );
            kernels.push(KernelReport {
                name: site.name.clone(),
                kind: site.kind,
                ir,
                span: site.function.span,
                position: ctx.line_index.line_col(site.function.span.start),
            });
        }

        if self.options.auto_naming_enabled {
            let targets = splice::autoname_targets(program, &ctx);
            splice::apply_autonames(&mut buffer, &targets);
        }

        if needs_prelude && !operators::has_prelude(code) {
            let offset = splice::prelude_offset(program);
            if offset == 0 {
                buffer.prepend(0, format!("{}\n", operators::prelude()));
            } else {
                buffer.append(offset, format!("\n{}", operators::prelude()));
            }
        }

        if !buffer.has_changes() {
            return Ok(Outcome::Unchanged(ctx.diagnostics.into_vec()));
        }
        Ok(Outcome::Transformed(TransformOutput {
            code: buffer.to_string(),
            map: buffer.generate_map(id, true),
            kernels,
            diagnostics: ctx.diagnostics.into_vec(),
        }))
    }

    /// Function expression the host keeps for `site`
    fn host_function(
        &self,
        code: &str,
        site: &KernelSite<'_>,
        ctx: &mut FileContext,
        needs_prelude: &mut bool,
    ) -> Vec<Piece> {
        match site.kind {
            KernelKind::Shell => {
                let span = site.function.span;
                splice::function_pieces(
                    site,
                    vec![Piece::Original {
                        start: span.start,
                        end: span.end,
                    }],
                )
            }
            KernelKind::DeviceOnly => splice::device_stub(site),
            KernelKind::Dual => {
                let rewritten = operators::rewrite_function(code, site.function);
                for span in &rewritten.skipped {
                    ctx.diagnostics.warn(
                        W_OPERATOR,
                        "compound assignment target is not a plain identifier or member chain; left as plain JS",
                        &ctx.file_id,
                        *span,
                        &ctx.line_index,
                    );
                }
                *needs_prelude |= rewritten.rewrites > 0;
                splice::function_pieces(site, rewritten.pieces)
            }
        }
    }

    fn warn_hoisting(&self, program: &Program, site: &KernelSite<'_>, ctx: &mut FileContext) {
        let is_declaration = matches!(
            site.form,
            SiteForm::Declaration | SiteForm::ExportedDeclaration | SiteForm::DefaultExportedDeclaration
        );
        let Some(name) = site.name.as_deref().filter(|_| is_declaration) else {
            return;
        };
        for span in splice::early_references(program, name, site.span) {
            ctx.diagnostics.warn(
                W_HOIST,
                format!("`{}` is used before its definition, which is no longer hoisted", name),
                &ctx.file_id,
                span,
                &ctx.line_index,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(code: &str) -> Option<TransformOutput> {
        Pipeline::new(Options::default())
            .unwrap()
            .transform(code, "src/main.ts")
            .unwrap()
    }

    #[test]
    fn test_untouched_file() {
        assert!(run("const x = 1;\nexport { x };").is_none());
    }

    #[test]
    fn test_shell_kernel_spliced() {
        let code = "import tgpu from 'typegpu';\nconst add = tgpu.fn([])((a, b) => a + b);";
        let output = run(code).unwrap();
        assert!(output.code.contains(
            "tgpu.fn([])((($) => ((globalThis.__TYPEGPU_META__ ??= new WeakMap()).set($.f = ((a, b) => a + b), { v: 2, name: \"add\", ast: "
        ));
        assert!(output
            .code
            .contains("const add = (globalThis.__TYPEGPU_AUTONAME__ ?? ((v) => v))(tgpu.fn([])"));
        assert_eq!(output.kernels.len(), 1);
        assert_eq!(output.kernels[0].kind, KernelKind::Shell);
        assert_eq!(output.kernels[0].position, LineCol { line: 1, column: 24 });
        // The shell kernel keeps plain operators on the host
        assert!(!output.code.contains("__tgpu_op"));
    }

    #[test]
    fn test_dual_kernel_gets_prelude() {
        let code = "import tgpu from 'typegpu';\nfunction mix(a, b) {\n  'kernel & js';\n  return a * b;\n}";
        let output = run(code).unwrap();
        let lines: Vec<&str> = output.code.lines().collect();
        assert_eq!(lines[0], "import tgpu from 'typegpu';");
        assert_eq!(lines[1], operators::prelude());
        assert!(lines[2].starts_with("const mix = (($) =>"));
        assert!(output.code.contains("return __tgpu_op.mul(a, b);"));
    }

    #[test]
    fn test_device_only_stub() {
        let output = run("export function shade() {\n  'kernel';\n  return 1;\n}").unwrap();
        assert!(output.code.starts_with("export const shade = (($) =>"));
        assert!(output.code.contains("executable only on the GPU"));
        assert!(!output.code.contains("return 1;"));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let code = "import tgpu from 'typegpu';\n\
                    const k = tgpu.fn([])((x) => x * 2);\n\
                    export function d(a) { 'kernel & js'; let s = a; s += 1; return s; }\n\
                    const o = { m() { 'kernel'; return 1; } };";
        let first = run(code).unwrap();
        assert!(run(&first.code).is_none());
    }

    #[test]
    fn test_parse_failure_passes_through() {
        assert!(run("function ( {").is_none());

        let pipeline = Pipeline::new(Options::default()).unwrap();
        let outcome = pipeline.run("function ( {", "src/broken.ts").unwrap();
        assert!(matches!(outcome, Outcome::Unchanged(_)));
        let codes: Vec<&str> = outcome.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(codes, [W_PARSE]);
        assert_eq!(outcome.diagnostics()[0].file, "src/broken.ts");
    }

    #[test]
    fn test_unchanged_file_keeps_class_warning() {
        let pipeline = Pipeline::new(Options::default()).unwrap();
        let outcome = pipeline
            .run("class C { run() { 'kernel'; } }", "src/c.ts")
            .unwrap();
        assert!(outcome.clone().into_output().is_none());
        assert_eq!(outcome.diagnostics()[0].code, W_CLASS);
    }

    #[test]
    fn test_block_comments_around_kernels() {
        let code = "/** Adds two values */\nfunction addGPU(a, b) {\n  'kernel & js';\n  /* sum */\n  return a + b;\n}";
        let output = run(code).expect("Expected the kernel to be lowered");
        assert_eq!(output.kernels.len(), 1);
        assert_eq!(output.kernels[0].name.as_deref(), Some("addGPU"));
        assert!(output.code.contains("/** Adds two values */\nconst addGPU = (($) =>"));
        assert!(output.code.contains("/* sum */"));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_recursive_kernel_captures_itself() {
        let output = run("function fib(n) {\n  'kernel & js';\n  if (n < 2) { return n; }\n  return fib(n - 1) + fib(n - 2);\n}").unwrap();
        assert_eq!(output.kernels[0].ir.external_names, ["fib"]);
        assert!(output.code.contains("externals: () => ({ fib })"));

        let output = run("const f = function walk(n) { 'kernel'; return walk(n); };").unwrap();
        assert!(output.kernels[0].ir.external_names.is_empty());
    }

    #[test]
    fn test_map_tracks_lines_inside_kernels() {
        let code = "import tgpu from 'typegpu';\n\
                    const add = tgpu.fn([])((a, b) => {\n\
                    \x20 const sum = a + b;\n\
                    \x20 return sum;\n\
                    });\n\
                    export function mix(a, b) {\n\
                    \x20 'kernel & js';\n\
                    \x20 let t = a;\n\
                    \x20 t += b;\n\
                    \x20 return t;\n\
                    }";
        let output = run(code).unwrap();
        let lines = output.map.decode_mappings().unwrap();
        let generated: Vec<&str> = output.code.split('\n').collect();
        let original: Vec<&str> = code.split('\n').collect();

        for text in ["  const sum = a + b;", "  return sum;", "  let t = a;", "  return t;"] {
            let gen_line = generated
                .iter()
                .position(|line| *line == text)
                .unwrap_or_else(|| panic!("missing line {:?}", text));
            let src_line = original.iter().position(|line| *line == text).unwrap();
            assert_eq!(lines[gen_line][0], [0, 0, src_line as i64, 0], "{:?}", text);
        }
    }

    #[test]
    fn test_lowering_error_is_fatal() {
        let err = Pipeline::new(Options::default())
            .unwrap()
            .transform("function f() {\n  'kernel';\n  throw 1;\n}", "bad.ts")
            .unwrap_err();
        assert_eq!(err.code(), "E-LOWER-001");
        assert_eq!(
            err.to_string(),
            "unsupported construct `throw` in kernel \"f\" at bad.ts:3:3"
        );
    }

    #[test]
    fn test_warnings() {
        let code = "use(f);\nfunction f() { 'kernel'; }\nclass C { run() { 'kernel'; } }\nfunction g(o) { 'kernel & js'; o.list[i()] += 1; }";
        let output = run(code).unwrap();
        let codes: Vec<&str> = output.diagnostics.iter().map(|d| d.code).collect();
        assert!(codes.contains(&W_HOIST));
        assert!(codes.contains(&W_CLASS));
        assert!(codes.contains(&W_OPERATOR));
        assert!(output.code.contains("class C { run() { 'kernel'; } }"));
    }

    #[test]
    fn test_should_transform() {
        let pipeline = Pipeline::new(Options::default()).unwrap();
        assert!(pipeline.should_transform("a.ts", "import tgpu from 'typegpu';"));
        assert!(!pipeline.should_transform("a.ts", "const x = 1;"));
        assert!(!pipeline.should_transform("a.css", "import tgpu from 'typegpu';"));

        let options = Options {
            early_pruning: false,
            ..Options::default()
        };
        let pipeline = Pipeline::new(options).unwrap();
        assert!(pipeline.should_transform("a.ts", "const x = 1;"));
    }

    #[test]
    fn test_forced_alias_and_target_version() {
        let options = Options {
            force_tgpu_alias: Some("gpu".to_string()),
            ir_version: 1,
            ..Options::default()
        };
        let pipeline = Pipeline::new(options).unwrap();
        let output = pipeline
            .transform("const f = gpu.fn([])((x) => x);", "a.ts")
            .unwrap()
            .unwrap();
        assert_eq!(output.kernels[0].ir.v, 1);

        let err = pipeline
            .transform("const f = gpu.fn([])((x) => x ? 1 : 2);", "a.ts")
            .unwrap_err();
        assert_eq!(err.code(), "E-LOWER-002");
    }
}
