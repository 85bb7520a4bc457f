//! Host tool adapters
//!
//! Each adapter filters the file, obtains an AST (its host's, normalized, or
//! our own parse), runs the shared [`Pipeline`] and shapes the result the
//! way its host expects.

pub mod babel;
pub mod bun;
pub mod rollup;
pub mod standalone;
pub mod webpack;

pub use babel::BabelPlugin;
pub use bun::{BunLoader, BunOutput};
pub use rollup::{RollupOutput, RollupPlugin};
pub use standalone::StandaloneTransform;
pub use webpack::{LoaderOutput, WebpackLoader};

use crate::Pipeline;

/// Common surface of every adapter
pub trait Backend {
    /// Name reported to the host tool
    const NAME: &'static str;

    fn pipeline(&self) -> &Pipeline;

    fn should_transform(&self, id: &str, code: &str) -> bool {
        let wanted = self.pipeline().should_transform(id, code);
        if !wanted {
            log::trace!("{}: skipping {}", Self::NAME, id);
        }
        wanted
    }
}
