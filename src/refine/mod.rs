// Feedback-driven artifact refinement.
// A remote enhancement path behind a timeout, with a deterministic local
// heuristic that always works as the fallback.

pub mod artifact;
pub mod engine;
pub mod local;
pub mod remote;

pub use artifact::{ArtifactDescription, ArtifactVault, SceneDescriptor};
pub use engine::RefinementEngine;
pub use remote::{Enhancer, HttpEnhancer};
