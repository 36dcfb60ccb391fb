use clap::Parser;
use rand_chacha::ChaCha12Rng;
use rand_core::{RngCore, SeedableRng};
use reseeder::{ReseedingRng, SeedReader};
use seedbuf::SeedRing;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[clap(name = "pipeline")]
#[clap(about = "Feed OS entropy through a seed ring into reseeding generators", long_about = None)]
struct Args {
    /// Ring capacity in bytes; must be a power of two.
    #[clap(short, long, default_value_t = 4096)]
    capacity: usize,

    /// Bytes each producer pulls from the OS per iteration.
    #[clap(short, long, default_value_t = 128)]
    read_size: usize,

    /// Number of producer threads.
    #[clap(short, long, default_value_t = 2)]
    producers: usize,

    /// Number of consumer threads.
    #[clap(long, default_value_t = 4)]
    consumers: usize,

    /// Random words each consumer draws.
    #[clap(short, long, default_value_t = 1_000_000)]
    iterations: u64,
}

const SEED_SIZE: usize = 32;

fn chacha_factory(seed: &[u8]) -> ChaCha12Rng {
    let mut key = [0u8; 32];
    key.copy_from_slice(seed);
    ChaCha12Rng::from_seed(key)
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let ring = Arc::new(SeedRing::new(args.capacity)?);
    info!(capacity = args.capacity, "seed ring created");

    let readers: Vec<_> = (0..args.producers)
        .map(|_| SeedReader::os(&ring, args.read_size).spawn())
        .collect::<Result<_, _>>()?;

    let started = Instant::now();
    let consumers: Vec<_> = (0..args.consumers)
        .map(|id| {
            let ring = Arc::clone(&ring);
            let iterations = args.iterations;
            thread::spawn(move || {
                let mut rng = ReseedingRng::new(ring, SEED_SIZE, chacha_factory);
                let mut acc = 0u64;
                for _ in 0..iterations {
                    acc = acc.wrapping_add(rng.next_u64());
                }
                info!(
                    consumer = id,
                    reseeds = rng.reseed_count(),
                    checksum = acc,
                    "consumer finished"
                );
            })
        })
        .collect();

    for consumer in consumers {
        consumer.join().expect("consumer thread panicked");
    }
    let elapsed = started.elapsed();
    info!(
        words = args.consumers as u64 * args.iterations,
        elapsed_ms = elapsed.as_millis() as u64,
        "all consumers done"
    );

    drop(ring);
    for reader in readers {
        reader.join().expect("seed reader panicked")?;
    }
    info!("producers drained and stopped");
    Ok(())
}
