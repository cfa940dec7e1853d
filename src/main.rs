use burn::prelude::*;
use burn::tensor::Distribution;
use edvr_rust::{
    EdvrConfig,
    benchmark::ScaleBenchmark,
    device::{Backend, init_device},
};

fn main() {
    // Initialize device with centralized WGPU setup
    let device = init_device();
    println!("WGPU device selected: {:?}", device);

    // Optional JSON config path, defaults otherwise
    let config = match std::env::args().nth(1) {
        Some(path) => EdvrConfig::load(&path).expect("Config should be loaded successfully"),
        None => EdvrConfig::new(),
    };

    println!("Model Configuration:");
    println!("  - Feature channels: {}", config.nf);
    println!("  - Frames: {} (center {})", config.nframes, config.center());
    println!("  - Scale: {}x", config.scale);
    println!("  - Groups: {}", config.groups);
    println!("  - Residual blocks: {} front / {} back", config.front_rbs, config.back_rbs);
    println!();

    let model = config
        .init::<Backend>(&device)
        .expect("Model should be initialized successfully");

    // Forward pass on a random low-resolution clip
    let frames = Tensor::<Backend, 5>::random(
        [1, config.nframes, 3, 64, 64],
        Distribution::Uniform(0.0, 1.0),
        &device,
    );
    println!("Input shape: {:?}", frames.dims());

    let output = model.forward(frames).expect("Forward pass should succeed");
    println!("Output shape: {:?}", output.dims());
    println!("Output device: {:?}", output.device());
    println!();

    // Compare the cost of each supported scale on a smaller clip
    let bench = ScaleBenchmark::<Backend>::new(device, 1, config.nframes, 32, 32);
    let results = bench
        .compare_scales(&config, &[2, 3, 4])
        .expect("Benchmark should run for supported scales");
    println!("{}", bench.generate_report(&results));
}
