pub mod compiled_overlay;
pub mod compiler;
pub mod emitter;

pub use compiled_overlay::{OverlaySource, ResolvedOverlay};
pub use compiler::OverlayCompiler;
pub use emitter::emit;
