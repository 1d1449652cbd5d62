//! B-spline ansatz spaces on multipatch geometries.
//!
//! A [`SuperSpace`] provides the element-local Bernstein basis all discrete
//! operators are assembled in. The [`Projector`] embeds smooth tensor product
//! B-splines patchwise into that basis and the [`Glue`] identifies matching
//! dofs across patch boundaries; [`AnsatzSpace`] combines both into the
//! transformation matrix of the final trial space.

mod function_evaluator;
mod glue;
mod projector;
mod space;
mod superspace;

pub use function_evaluator::FunctionEvaluator;
pub use glue::Glue;
pub use projector::Projector;
pub use space::AnsatzSpace;
pub use superspace::SuperSpace;
