pub mod frames;
pub mod labels;
pub mod naming;
pub mod npy;
pub mod sink;
