use std::time::{Duration, Instant};

/// Frame-rate cap supplied at engine construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FpsCap {
    /// Render a single frame and stop (`fps_cap: 0`).
    Once,
    /// Uncapped, driven by whatever display-synchronized source the host
    /// provides (`fps_cap` unset / `*`).
    DisplaySync,
    /// Capped to the given rate via a timer fallback.
    Capped(u32),
}

impl Default for FpsCap {
    fn default() -> Self {
        FpsCap::DisplaySync
    }
}

/// What the driving loop should do after a completed tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameAdvice {
    /// Do not schedule another tick.
    Stop,
    /// Schedule the next tick on the display-synchronized source.
    DisplaySync,
    /// Schedule the next tick on a timer after the given delay.
    Timer(Duration),
}

/// Buckets ticks into whole seconds and reports the previous second's count.
///
/// Mirrors the frame counter the frame loop exposes as `fps()`: the value is
/// zero until one full second has elapsed.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    bucket_start: Instant,
    ticks_in_bucket: u32,
    last_second: u32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            bucket_start: Instant::now(),
            ticks_in_bucket: 0,
            last_second: 0,
        }
    }

    /// Records one tick at `now`.
    pub fn tick(&mut self, now: Instant) {
        if now.duration_since(self.bucket_start) >= Duration::from_secs(1) {
            self.last_second = self.ticks_in_bucket;
            self.ticks_in_bucket = 0;
            self.bucket_start = now;
        }
        self.ticks_in_bucket += 1;
    }

    /// Frames counted during the most recently completed second.
    pub fn fps(&self) -> u32 {
        self.last_second
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pacing decision for the next tick.
///
/// Display-sync stays in use while a high cap (>= 61) is not actually being
/// exceeded by the measured rate; otherwise a fixed-interval timer enforces
/// the cap. A cap of zero renders once and stops.
pub fn advise(cap: FpsCap, measured_fps: u32) -> FrameAdvice {
    match cap {
        FpsCap::Once => FrameAdvice::Stop,
        FpsCap::DisplaySync => FrameAdvice::DisplaySync,
        FpsCap::Capped(limit) => {
            if limit >= 61 && measured_fps < 61 {
                FrameAdvice::DisplaySync
            } else {
                FrameAdvice::Timer(Duration::from_secs_f64(1.0 / f64::from(limit.max(1))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn once_stops() {
        assert_eq!(advise(FpsCap::Once, 0), FrameAdvice::Stop);
    }

    #[test]
    fn uncapped_stays_on_display_sync() {
        assert_eq!(advise(FpsCap::DisplaySync, 240), FrameAdvice::DisplaySync);
    }

    #[test]
    fn high_cap_uses_display_sync_until_exceeded() {
        assert_eq!(advise(FpsCap::Capped(120), 59), FrameAdvice::DisplaySync);
        assert!(matches!(advise(FpsCap::Capped(120), 119), FrameAdvice::Timer(_)));
    }

    #[test]
    fn low_cap_always_times() {
        let FrameAdvice::Timer(d) = advise(FpsCap::Capped(30), 10) else {
            panic!("expected timer pacing");
        };
        assert!((d.as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn counter_reports_previous_second() {
        let mut c = FpsCounter::new();
        let t0 = Instant::now();
        for i in 0..5 {
            c.tick(t0 + Duration::from_millis(i * 10));
        }
        assert_eq!(c.fps(), 0);

        c.tick(t0 + Duration::from_millis(1001));
        assert_eq!(c.fps(), 5);
    }
}
