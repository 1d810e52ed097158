/*
    Stall Detector
*/

use libm::fabsf;

/* --------------------------- Code -------------------------- */
/// Flags a stall once the motor has been commanded to move but stayed below
/// the stall speed for long enough.
pub struct StallDetector {
    stall_duration_ms: u32,
    stalled: bool,
}

impl StallDetector {
    pub const fn new() -> Self {
        Self {
            stall_duration_ms: 0,
            stalled: false,
        }
    }

    pub fn reset(&mut self) {
        self.stall_duration_ms = 0;
        self.stalled = false;
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn stall_duration_ms(&self) -> u32 {
        self.stall_duration_ms
    }

    /// Advances the detector by one tick of `loop_time_ms`.
    ///
    /// Speeds share one unit, whatever the caller uses.
    pub fn update(&mut self, reference_speed: f32, measured_speed: f32, stall_speed_limit: f32, loop_time_ms: u32, stall_time_ms: u32) -> bool {
        let commanded = reference_speed != 0.0;
        let too_slow = fabsf(measured_speed) < stall_speed_limit;

        if commanded && too_slow {
            self.stall_duration_ms = self.stall_duration_ms.saturating_add(loop_time_ms);
        }
        else {
            self.stall_duration_ms = 0;
        }

        self.stalled = self.stall_duration_ms >= stall_time_ms && self.stall_duration_ms > 0;
        self.stalled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stall_after_stall_time() {
        let mut detector = StallDetector::new();

        for _ in 0..19 {
            assert!(!detector.update(100.0, 0.0, 5.0, 10, 200));
        }
        assert!(detector.update(100.0, 0.0, 5.0, 10, 200));
        assert_eq!(detector.stall_duration_ms(), 200);
    }

    #[test]
    fn test_single_fast_tick_resets() {
        let mut detector = StallDetector::new();

        for _ in 0..15 {
            detector.update(100.0, 0.0, 5.0, 10, 200);
        }
        detector.update(100.0, 6.0, 5.0, 10, 200);
        assert_eq!(detector.stall_duration_ms(), 0);

        for _ in 0..19 {
            assert!(!detector.update(100.0, -4.0, 5.0, 10, 200));
        }
        assert!(detector.update(100.0, -4.0, 5.0, 10, 200));
    }

    #[test]
    fn test_no_stall_without_motion_command() {
        let mut detector = StallDetector::new();

        for _ in 0..100 {
            assert!(!detector.update(0.0, 0.0, 5.0, 10, 200));
        }
        assert_eq!(detector.stall_duration_ms(), 0);
    }

    #[test]
    fn test_stall_clears_when_motor_moves_again() {
        let mut detector = StallDetector::new();

        for _ in 0..30 {
            detector.update(100.0, 0.0, 5.0, 10, 200);
        }
        assert!(detector.is_stalled());

        detector.update(100.0, 90.0, 5.0, 10, 200);
        assert!(!detector.is_stalled());
    }
}
