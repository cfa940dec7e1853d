//! Per-scale forward-pass benchmark
//!
//! Runs the same input clip through EDVR models built for different
//! upsampling factors and compares their cost.

use burn::module::Module;
use burn::tensor::{Distribution, Tensor, backend::Backend};
use std::time::Instant;

use crate::error::Result;
use crate::model::EdvrConfig;

/// Benchmark results for a single scale
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub scale: usize,
    pub forward_time_ms: f64,
    pub memory_mb: f64,
    pub param_count: usize,
    pub output_dims: [usize; 4],
}

/// Multi-scale benchmark runner
pub struct ScaleBenchmark<B: Backend> {
    device: B::Device,
    test_input: Tensor<B, 5>, // Common clip for all scales
    num_runs: usize,
}

impl<B: Backend> ScaleBenchmark<B> {
    /// Input clip is `[batch, nframes, 3, height, width]` with uniform noise.
    pub fn new(device: B::Device, batch_size: usize, nframes: usize, height: usize, width: usize) -> Self {
        let test_input = Tensor::random(
            [batch_size, nframes, 3, height, width],
            Distribution::Uniform(0.0, 1.0),
            &device,
        );

        Self { device, test_input, num_runs: 3 }
    }

    pub fn with_num_runs(mut self, num_runs: usize) -> Self {
        self.num_runs = num_runs.max(1);
        self
    }

    /// Time `num_runs` forward passes of a model built from `config`.
    pub fn run(&self, config: &EdvrConfig) -> Result<BenchmarkResult> {
        let model = config.init::<B>(&self.device)?;
        let param_count = model.num_params();

        let start = Instant::now();
        let mut output_dims = [0; 4];
        for _ in 0..self.num_runs {
            output_dims = model.forward(self.test_input.clone())?.dims();
        }
        let forward_time_ms = start.elapsed().as_secs_f64() * 1000.0 / self.num_runs as f64;

        Ok(BenchmarkResult {
            scale: config.scale,
            forward_time_ms,
            memory_mb: (param_count * std::mem::size_of::<f32>()) as f64 / (1024.0 * 1024.0),
            param_count,
            output_dims,
        })
    }

    /// Benchmark `base` once per scale.
    pub fn compare_scales(&self, base: &EdvrConfig, scales: &[usize]) -> Result<Vec<BenchmarkResult>> {
        scales
            .iter()
            .map(|&scale| self.run(&base.clone().with_scale(scale)))
            .collect()
    }

    /// Generate comparison report
    pub fn generate_report(&self, results: &[BenchmarkResult]) -> String {
        let mut report = String::new();
        report.push_str("EDVR Scale Comparison Report\n");
        report.push_str("============================\n\n");

        for result in results {
            report.push_str(&format!(
                "Scale: {}x\n\
                 Forward Time: {:.2} ms\n\
                 Parameter Memory: {:.2} MB\n\
                 Parameters: {}\n\
                 Output: {:?}\n\n",
                result.scale,
                result.forward_time_ms,
                result.memory_mb,
                result.param_count,
                result.output_dims,
            ));
        }

        report
    }
}
