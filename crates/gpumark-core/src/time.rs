// SPDX-License-Identifier: CEPL-1.0
use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic microseconds since the first call in this process.
pub fn timestamp_us() -> u64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_micros() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_never_go_backwards() {
        let a = timestamp_us();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = timestamp_us();
        assert!(b >= a + 1_000, "expected at least 1ms between {a} and {b}");
    }
}
