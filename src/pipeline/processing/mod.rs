pub mod extract;
pub mod feasibility;
pub mod normalize;
