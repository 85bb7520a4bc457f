//! Per-file state and the alias resolver

use tgpu_ast::{Expr, ExprKind, ImportDecl, ImportSpecifier, LineIndex, MemberProp, Program};

use crate::diagnostics::Diagnostics;

/// Package whose root export marks the namespace
pub const PACKAGE_NAME: &str = "typegpu";
/// Name of the root namespace export
pub const ROOT_EXPORT: &str = "tgpu";

/// State for one file; created per file and dropped when it is done
#[derive(Debug)]
pub struct FileContext {
    pub file_id: String,
    /// Dotted paths that denote the root namespace, in registration order
    aliases: Vec<String>,
    pub line_index: LineIndex,
    pub diagnostics: Diagnostics,
}

impl FileContext {
    pub fn new(file_id: impl Into<String>, source: &str) -> Self {
        Self {
            file_id: file_id.into(),
            aliases: Vec::new(),
            line_index: LineIndex::new(source),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn add_alias(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.aliases.contains(&path) {
            log::trace!("{}: namespace alias `{}`", self.file_id, path);
            self.aliases.push(path);
        }
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Register every alias introduced by `import`
    pub fn register_import(&mut self, import: &ImportDecl) {
        if import.type_only || import.source != PACKAGE_NAME {
            return;
        }
        for specifier in &import.specifiers {
            match specifier {
                ImportSpecifier::Default { local } => self.add_alias(local.name.clone()),
                ImportSpecifier::Named {
                    imported,
                    local,
                    type_only: false,
                } if imported == ROOT_EXPORT => self.add_alias(local.name.clone()),
                ImportSpecifier::Namespace { local } => {
                    self.add_alias(format!("{}.{}", local.name, ROOT_EXPORT))
                }
                ImportSpecifier::Named { .. } => {}
            }
        }
    }

    /// Register the aliases of every top-level import in `program`
    pub fn resolve_aliases(&mut self, program: &Program) {
        for import in program.imports() {
            self.register_import(import);
        }
    }

    /// Whether `expr` denotes the root namespace
    pub fn is_alias(&self, expr: &Expr) -> bool {
        member_path(expr).is_some_and(|path| self.aliases.contains(&path))
    }

    /// Whether `expr` is a call/member chain whose innermost object is the
    /// root namespace: `tgpu.fn(...)(...)`, `ns.tgpu['~unstable'].x()`
    pub fn is_rooted_at_alias(&self, expr: &Expr) -> bool {
        let mut current = expr.unwrap_ts();
        loop {
            if self.is_alias(current) {
                return true;
            }
            current = match &current.kind {
                ExprKind::Call { callee, .. } => callee.unwrap_ts(),
                ExprKind::Member { object, .. } => object.unwrap_ts(),
                _ => return false,
            };
        }
    }
}

/// Dotted path of an identifier/member chain. Static names and string
/// literal keys are accepted; any other computed access yields `None`.
pub fn member_path(expr: &Expr) -> Option<String> {
    match &expr.unwrap_ts().kind {
        ExprKind::Ident(name) => Some(name.clone()),
        ExprKind::Member {
            object,
            property,
            optional: false,
        } => {
            let name = match property {
                MemberProp::Ident { name, .. } => name.as_str(),
                MemberProp::Computed(key) => key.as_str_lit()?,
                MemberProp::Private { .. } => return None,
            };
            Some(format!("{}.{}", member_path(object)?, name))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgpu_ast::StmtKind;

    fn context_for(source: &str) -> (FileContext, Program) {
        let program = tgpu_parser::parse(source).unwrap();
        let mut ctx = FileContext::new("test.ts", source);
        ctx.resolve_aliases(&program);
        (ctx, program)
    }

    fn last_expr(program: &Program) -> &Expr {
        match &program.body.last().unwrap().kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_import_styles() {
        let (ctx, _) = context_for(
            "import gpu from 'typegpu';\n\
             import { tgpu as t, d } from 'typegpu';\n\
             import * as T from 'typegpu';\n\
             import type { tgpu as Ty } from 'typegpu';\n\
             import other from 'other-lib';",
        );
        assert_eq!(ctx.aliases(), ["gpu", "t", "T.tgpu"]);
    }

    #[test]
    fn test_alias_usage_through_member_chain() {
        let (ctx, program) = context_for("import * as T from 'typegpu';\nT['tgpu'];");
        assert!(ctx.is_alias(last_expr(&program)));

        let (ctx, program) = context_for("import * as T from 'typegpu';\nT[key];");
        assert!(!ctx.is_alias(last_expr(&program)));

        let (ctx, program) = context_for("import * as T from 'typegpu';\nT;");
        assert!(!ctx.is_alias(last_expr(&program)));
    }

    #[test]
    fn test_rooted_at_alias() {
        let (ctx, program) = context_for("import tgpu from 'typegpu';\ntgpu['~unstable'].computeFn({})(x);");
        assert!(ctx.is_rooted_at_alias(last_expr(&program)));

        let (ctx, program) = context_for("import tgpu from 'typegpu';\nother.fn([])(x);");
        assert!(!ctx.is_rooted_at_alias(last_expr(&program)));
    }

    #[test]
    fn test_forced_alias() {
        let (mut ctx, program) = context_for("gpu.fn;");
        assert!(ctx.aliases().is_empty());
        ctx.add_alias("gpu");
        ctx.add_alias("gpu");
        assert_eq!(ctx.aliases(), ["gpu"]);
        assert!(ctx.is_rooted_at_alias(last_expr(&program)));
    }
}
