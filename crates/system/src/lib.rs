pub mod cpu;
pub mod sampler;

pub use cpu::{MetricSource, SysinfoSource};
pub use sampler::{Sampler, SamplerHandle, SamplerState, SamplerStatus};
