pub mod deepseek;
pub mod normalizer;
pub mod perf;
