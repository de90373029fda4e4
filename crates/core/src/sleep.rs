use rand::Rng;
use std::thread;
use std::time::Duration;

/// Sleep for `ms` milliseconds with +/-30% random jitter. Zero sleeps not at all.
pub fn sleep_jitter_ms(ms: u64) {
    if ms == 0 {
        return;
    }
    let secs = ms as f64 / 1000.0;
    let jitter = secs * 0.3;
    let actual = secs + rand::thread_rng().gen_range(-jitter..jitter);
    thread::sleep(Duration::from_secs_f64(actual.max(0.001)));
}

/// Sleep for exact milliseconds (no jitter).
pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
