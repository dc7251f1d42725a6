//! Throttled I/O (component B, §4/§5, §11). Enforces a max-IOPS and max-IO-size cap
//! with short sleeps, never locks — grounded on `sphThrottleSleep`/`sphReadThrottled`/
//! `sphWriteThrottled` in `original_source/neo/io/io.cpp`.

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    pub max_iops: i32,
    pub max_io_size: i32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig { max_iops: 0, max_io_size: 0 }
    }
}

/// Shared throttle state: one instance serves every file the process has open, matching
/// the original's single global `g_tThrottle`.
pub struct Throttle {
    cfg: ThrottleConfig,
    last_io: Instant,
}

impl Throttle {
    pub fn new(cfg: ThrottleConfig) -> Self {
        Throttle { cfg, last_io: Instant::now() }
    }

    fn sleep_if_needed(&mut self) {
        if self.cfg.max_iops <= 0 {
            return;
        }
        let interval = Duration::from_micros(1_000_000 / self.cfg.max_iops as u64);
        let now = Instant::now();
        let target = self.last_io + interval;
        if target > now {
            thread::sleep(target - now);
            self.last_io = target;
        } else {
            self.last_io = now;
        }
    }

    fn chunk_size(&self) -> usize {
        const DEFAULT_CHUNK: usize = 1 << 30;
        if self.cfg.max_io_size >= 4096 {
            DEFAULT_CHUNK.min(self.cfg.max_io_size as usize)
        } else {
            DEFAULT_CHUNK
        }
    }

    /// Read exactly `buf.len()` bytes (or fewer at EOF) from `src`, chunked and throttled.
    pub fn read(&mut self, src: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.chunk_size();
        let mut total = 0;
        while total < buf.len() {
            self.sleep_if_needed();
            let end = (total + chunk).min(buf.len());
            let n = src.read(&mut buf[total..end])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    /// Write all of `data` to `dst`, chunked and throttled.
    pub fn write_all(&mut self, dst: &mut impl Write, data: &[u8]) -> io::Result<()> {
        let chunk = self.chunk_size();
        let mut offset = 0;
        while offset < data.len() {
            self.sleep_if_needed();
            let end = (offset + chunk).min(data.len());
            dst.write_all(&data[offset..end])?;
            offset = end;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unthrottled_reads_everything_in_one_pass() {
        let mut throttle = Throttle::new(ThrottleConfig::default());
        let mut src: &[u8] = b"hello world";
        let mut buf = [0u8; 11];
        let n = throttle.read(&mut src, &mut buf).unwrap();
        assert_eq!(n, 11);
        assert_eq!(&buf, b"hello world");
    }

    #[test]
    fn chunked_write_reassembles_whole_payload() {
        let mut throttle = Throttle::new(ThrottleConfig { max_iops: 0, max_io_size: 4096 });
        let mut dst = Vec::new();
        let payload = vec![7u8; 10_000];
        throttle.write_all(&mut dst, &payload).unwrap();
        assert_eq!(dst, payload);
    }
}
