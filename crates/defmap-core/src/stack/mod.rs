pub mod assembler;
pub mod deformation;

pub use assembler::{assemble_stack, build_slice_stack, compute_pair_metric};
pub use deformation::{DeformationStack, StackId};
