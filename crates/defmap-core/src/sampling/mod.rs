pub mod kernel;
pub mod sampler;

pub use kernel::SamplingKernel;
pub use sampler::{sample_detection, sample_detections, LagSample, SampleTable};
