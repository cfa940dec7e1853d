use burn::backend::WebGpu;
use edvr_rust::EdvrConfig;

fn main() {
    type MyBackend = WebGpu<f32, i32>;

    let device = Default::default();
    let model = EdvrConfig::new()
        .init::<MyBackend>(&device)
        .expect("Default config uses a supported scale");

    println!("{model}");
}
