//! Cheap textual check run before parsing
//!
//! A file can only hold kernels if it mentions the package, the forced
//! alias, or a kernel directive. False positives are fine; false negatives
//! are not.

use crate::context::PACKAGE_NAME;
use crate::detect::DIRECTIVE_KERNEL;

pub fn may_contain_kernels(code: &str, forced_alias: Option<&str>) -> bool {
    if code.contains(PACKAGE_NAME) {
        return true;
    }
    if ['\'', '"', '`']
        .iter()
        .any(|quote| code.contains(&format!("{}{}", quote, DIRECTIVE_KERNEL)))
    {
        return true;
    }
    forced_alias
        .and_then(|alias| alias.split('.').next())
        .is_some_and(|root| !root.is_empty() && code.contains(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_candidates() {
        assert!(may_contain_kernels("import tgpu from 'typegpu';", None));
        assert!(may_contain_kernels("function f() { 'kernel'; }", None));
        assert!(may_contain_kernels("const f = () => { \"kernel & js\"; };", None));
        assert!(may_contain_kernels("gpu.fn([])(x)", Some("gpu")));
        assert!(may_contain_kernels("ns.tgpu.fn([])(x)", Some("ns.tgpu")));
    }

    #[test]
    fn test_prune_drops_unrelated() {
        assert!(!may_contain_kernels("export const x = 1;", None));
        assert!(!may_contain_kernels("const kernel = 1;", None));
        assert!(!may_contain_kernels("export const x = 1;", Some("gpu")));
    }
}
