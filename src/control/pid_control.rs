/*
    PID Control
*/

use crate::resources::config::MAX_INTEGRAL_DUTY;

/* --------------------------- Code -------------------------- */
/// Errors fed into one control update.
///
/// `position` is reference count minus measured count, `speed` is reference
/// speed minus measured speed (counts per second).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlError {
    pub position: f32,
    pub speed: f32,
}

pub struct PIDcontrol {
    kp: f32,
    ki: f32,
    kd: f32,
    integral: f32,
    max_threshold: f32,
    duty_offset: f32,
}

impl PIDcontrol {
    pub const fn new() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            integral: 0.0,
            max_threshold: 100.0,
            duty_offset: 0.0,
        }
    }

    pub fn update_pid_param(&mut self, kp: f32, ki: f32, kd: f32) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    /// Output ceiling (stall torque limit) and static friction offset, both in percent.
    pub fn update_duty_limits(&mut self, max_threshold: f32, duty_offset: f32) {
        self.max_threshold = max_threshold;
        self.duty_offset = duty_offset;
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    fn limit_output(&self, sig: f32) -> (f32, bool) {
        if sig > self.max_threshold {
            return (self.max_threshold, true);
        }

        if sig < -self.max_threshold {
            return (-self.max_threshold, true);
        }

        (sig, false)
    }

    fn add_offset(&self, sig: f32) -> f32 {
        if sig > 0.0 {
            sig + self.duty_offset
        }
        else if sig < 0.0 {
            sig - self.duty_offset
        }
        else {
            sig
        }
    }

    /// Position control: proportional and integral on position error,
    /// derivative on speed error.
    pub fn compute(&mut self, error: ControlError, dt: f32) -> f32 {
        let step = error.position * dt;
        self.integral += step;

        if self.ki > 0.0 {
            let max_integral = MAX_INTEGRAL_DUTY / self.ki;
            self.integral = self.integral.clamp(-max_integral, max_integral);
        }

        let sig = self.kp * error.position + self.ki * self.integral + self.kd * error.speed;
        let (sig, saturated) = self.limit_output(self.add_offset(sig));

        // Anti-windup: drop this tick's accumulation while the output is pinned
        if saturated {
            self.integral -= step;
        }

        sig
    }

    /// Speed control: proportional on the accumulated speed error (position
    /// error against a reference advancing at the set speed) and derivative
    /// on the instantaneous speed error. No integral term.
    pub fn compute_speed(&mut self, error: ControlError) -> f32 {
        let sig = self.kp * error.position + self.kd * error.speed;
        let (sig, _) = self.limit_output(self.add_offset(sig));
        sig
    }
}
