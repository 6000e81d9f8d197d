//! Full-duplex passthrough: captured audio is played straight back.
//!
//! Run with: `cargo run --example loopback`. Use headphones.

use std::time::{Duration, Instant};

use duplex_audio::{AudioStream, Catalog, IoType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let catalog = Catalog::probe()?;
    let binding = catalog
        .io_type(IoType::Duplex)
        .first()
        .cloned()
        .ok_or("no duplex-capable device found")?;
    let channels = binding.max_channels().min(2).max(1);
    println!(
        "looping back {} / {} ({} channels)",
        binding.system(),
        binding.device(),
        channels
    );

    let mut stream = AudioStream::new();
    let latency = binding.min_latency().max(0.02).min(binding.max_latency());
    stream.bind(&binding, latency, channels, channels)?;
    if !stream.open() || !stream.start() {
        return Err(stream.status().to_string().into());
    }
    println!("{}", stream.status());

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut block = vec![0.0f32; 1024 * usize::from(channels)];
    while Instant::now() < deadline {
        if !stream.in_buffer().read_exact(&mut block) {
            break;
        }
        let Some(mut grant) = stream.out_buffer().wait_reserve(block.len()) else {
            break;
        };
        grant.copy_from_slice(&block);
        grant.commit(block.len());
    }

    stream.stop();
    stream.close();
    println!(
        "done ({} input overflows, {} output underruns)",
        stream.input_overflows(),
        stream.output_overflows()
    );
    Ok(())
}
