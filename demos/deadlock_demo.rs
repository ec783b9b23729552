//! Deadlock Demo - opposite lock order
//!
//! Task1 takes Mutex1 then Mutex2, Task2 takes Mutex2 then Mutex1.
//! Both hold their first mutex for 100 ms, so they soon block on each
//! other. The monitor reports the stale holds after the 5 s timeout and
//! resets (exits) the simulated system.

use deadlock_guard::port::sim::{SimKernel, SimMutex};
use deadlock_guard::{Detector, DetectorConfig, Kernel, OsResult, TrackedMutex, WAIT_FOREVER};
use tracing_subscriber::EnvFilter;

type Guard = Detector<SimKernel>;
type DemoMutex = TrackedMutex<SimMutex>;

/// Take `first` then `second`, forever
fn worker(
    detector: &Guard,
    name: &str,
    first: &DemoMutex,
    second: &DemoMutex,
    start_delay_ms: u32,
) {
    let kernel = detector.kernel();
    kernel.delay_ms(start_delay_ms);

    loop {
        println!("{name}: taking {}", first.name());
        if detector.acquire(first, WAIT_FOREVER).is_ok() {
            println!("{name}: got {}", first.name());

            // Give the other task time to take its first mutex
            kernel.delay_ms(100);

            println!("{name}: taking {}", second.name());
            if detector.acquire(second, WAIT_FOREVER).is_ok() {
                println!("{name}: got {}", second.name());
                kernel.delay_ms(10);

                let _ = detector.release(second);
                println!("{name}: released {}", second.name());
            }

            let _ = detector.release(first);
            println!("{name}: released {}", first.name());
        }

        kernel.delay_ms(500);
    }
}

fn main() -> OsResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Deadlock demo starting (Ctrl+C to quit)");

    let kernel = SimKernel::new();
    let detector: &'static Guard =
        Box::leak(Box::new(Detector::init(kernel.clone(), DetectorConfig::new())?));

    let mutex1: &'static DemoMutex = Box::leak(Box::new(detector.create("Mutex1")?));
    let mutex2: &'static DemoMutex = Box::leak(Box::new(detector.create("Mutex2")?));

    kernel.spawn("Task1", move || worker(detector, "Task1", mutex1, mutex2, 0))?;
    kernel.spawn("Task2", move || worker(detector, "Task2", mutex2, mutex1, 50))?;

    let check = kernel.clone();
    kernel.spawn("Check", move || loop {
        check.delay_ms(2500);
        println!("System running - tick {}", check.tick_get());
    })?;

    detector.start_monitor()?;

    loop {
        std::thread::park();
    }
}
