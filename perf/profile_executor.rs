// Run with: cargo run --release --features profiling --bin profile_executor
// Or: RUST_LOG=nirgraph=trace cargo flamegraph --features profiling --bin profile_executor

use nirgraph::units::{self, Affine, Leaky};
use nirgraph::{load, IrGraph, IrNode, Tensor};

const WIDTH: usize = 128;
const DEPTH: usize = 6;

// input -> (affine -> leaky) x DEPTH -> output, last leaky fed back into the first affine
fn recurrent_ir() -> IrGraph {
    let mut ir = IrGraph::new().with_node("input", IrNode::input([WIDTH]));
    let mut previous = "input".to_string();

    for layer in 0..DEPTH {
        let weight: Vec<f32> = (0..WIDTH * WIDTH)
            .map(|i| ((i % 17) as f32 - 8.0) / (8.0 * WIDTH as f32))
            .collect();
        let affine = Affine::new(
            Tensor::new([WIDTH, WIDTH], weight).expect("weight shape"),
            Tensor::zeros([WIDTH]),
        )
        .expect("affine parameters");
        let lif = Leaky::new(0.95, 1.0);

        let affine_name = format!("affine{layer}");
        let lif_name = format!("lif{layer}");
        ir = ir
            .with_node(affine_name.clone(), affine.to_ir())
            .with_node(lif_name.clone(), lif.to_ir())
            .with_edge(previous, affine_name.clone())
            .with_edge(affine_name, lif_name.clone());
        previous = lif_name;
    }

    ir.with_node("output", IrNode::output([WIDTH]))
        .with_edge(previous.clone(), "output")
        .with_edge(previous, "affine0")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let num_steps = 20_000;
    let mut executor = load(recurrent_ir(), units::from_ir).expect("graph builds");
    let input = Tensor::full([WIDTH], 0.3);

    println!("=== Recurrent executor ({DEPTH} layers, width {WIDTH}) ===");
    println!("Order: {}", executor.execution_order().join(" -> "));
    println!("Processing {} steps...", num_steps);
    let start = std::time::Instant::now();

    let mut state = None;
    let mut spikes = 0.0;
    for _ in 0..num_steps {
        let (output, next) = executor
            .forward(&input, state.as_ref())
            .expect("forward pass");
        spikes += output.data().iter().sum::<f32>();
        state = Some(next);
    }

    let elapsed = start.elapsed();
    println!("Processed {} steps in {:?}", num_steps, elapsed);
    println!(
        "Steps per second: {:.2}",
        num_steps as f64 / elapsed.as_secs_f64()
    );
    println!(
        "Microseconds per step: {:.2}",
        elapsed.as_micros() as f64 / num_steps as f64
    );
    println!("Output spikes: {}", spikes);
}
