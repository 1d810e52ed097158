/*
    Motion Profile Generator
*/

use libm::sqrtf;

/* --------------------------- Code -------------------------- */
/// Reference state of a profile at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reference {
    pub position: f32,
    pub speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ProfileType {
    Trapezoidal,
    Triangular,
    Decelerating,
}

/// Accelerate, cruise and decelerate ramps along one direction.
///
/// All phases are expressed as unsigned travel along `direction`. `t_acc`,
/// `t_coast` and `t_dec` are phase durations in seconds.
#[derive(Clone, Copy, Debug)]
pub struct TrapezoidProfile {
    initial_position: f32,
    direction: f32,
    v_start: f32,
    v_cruise: f32,
    a_acc: f32,
    a_dec: f32,
    t_acc: f32,
    t_coast: f32,
    t_dec: f32,
    d_acc: f32,
    d_coast: f32,
    d_total: f32,
    profile_type: ProfileType,
}

impl TrapezoidProfile {
    /// Profile that ends at `target_position` with zero speed.
    ///
    /// `v_initial` is the current speed, `v_max` the cruise speed limit and
    /// `a_max` the ramp acceleration. A current speed pointing away from the
    /// target is treated as standstill.
    pub fn new(initial_position: f32, target_position: f32, v_initial: f32, v_max: f32, a_max: f32) -> Self {
        let displacement = target_position - initial_position;
        let direction = if displacement < 0.0 { -1.0 } else { 1.0 };
        let distance = displacement * direction;
        let v_max = v_max * sign(v_max);
        let a_max = a_max * sign(a_max);
        let v0 = (v_initial * direction).max(0.0);

        if distance <= 0.0 || v_max <= 0.0 || a_max <= 0.0 {
            return Self::stationary(initial_position);
        }

        // Already too fast to stop in the remaining distance: brake right away
        if v0 * v0 / (2.0 * a_max) >= distance {
            let a_dec = v0 * v0 / (2.0 * distance);
            return Self {
                initial_position,
                direction,
                v_start: v0,
                v_cruise: v0,
                a_acc: 0.0,
                a_dec,
                t_acc: 0.0,
                t_coast: 0.0,
                t_dec: v0 / a_dec,
                d_acc: 0.0,
                d_coast: 0.0,
                d_total: distance,
                profile_type: ProfileType::Decelerating,
            };
        }

        let a_acc = if v_max >= v0 { a_max } else { -a_max };
        let d_acc = (v_max * v_max - v0 * v0) / (2.0 * a_acc);
        let d_dec = (v_max * v_max) / (2.0 * a_max);

        if d_acc + d_dec <= distance {
            let d_coast = distance - d_acc - d_dec;
            Self {
                initial_position,
                direction,
                v_start: v0,
                v_cruise: v_max,
                a_acc,
                a_dec: a_max,
                t_acc: (v_max - v0) / a_acc,
                t_coast: d_coast / v_max,
                t_dec: v_max / a_max,
                d_acc,
                d_coast,
                d_total: distance,
                profile_type: ProfileType::Trapezoidal,
            }
        }
        else {
            let v_peak = sqrtf(a_max * distance + 0.5 * v0 * v0);
            Self {
                initial_position,
                direction,
                v_start: v0,
                v_cruise: v_peak,
                a_acc: a_max,
                a_dec: a_max,
                t_acc: (v_peak - v0) / a_max,
                t_coast: 0.0,
                t_dec: v_peak / a_max,
                d_acc: (v_peak * v_peak - v0 * v0) / (2.0 * a_max),
                d_coast: 0.0,
                d_total: distance,
                profile_type: ProfileType::Triangular,
            }
        }
    }

    /// Profile that runs at `v_target` and is back at zero speed after
    /// `duration` seconds. The end position follows from the ramps.
    pub fn for_duration(initial_position: f32, duration: f32, v_initial: f32, v_target: f32, a_max: f32) -> Self {
        let direction = if v_target < 0.0 { -1.0 } else { 1.0 };
        let v_max = v_target * direction;
        let a_max = a_max * sign(a_max);
        let v0 = (v_initial * direction).max(0.0);

        if duration <= 0.0 || a_max <= 0.0 || (v_max <= 0.0 && v0 <= 0.0) {
            return Self::stationary(initial_position);
        }

        // Not enough time to ramp down from the current speed: brake over the whole duration
        if v0 >= a_max * duration {
            let a_dec = v0 / duration;
            return Self {
                initial_position,
                direction,
                v_start: v0,
                v_cruise: v0,
                a_acc: 0.0,
                a_dec,
                t_acc: 0.0,
                t_coast: 0.0,
                t_dec: duration,
                d_acc: 0.0,
                d_coast: 0.0,
                d_total: 0.5 * v0 * duration,
                profile_type: ProfileType::Decelerating,
            };
        }

        let a_acc = if v_max >= v0 { a_max } else { -a_max };
        let t_acc = (v_max - v0) / a_acc;
        let t_dec = v_max / a_max;

        let (v_cruise, a_acc, t_acc, t_coast, t_dec, profile_type) = if t_acc + t_dec <= duration {
            (v_max, a_acc, t_acc, duration - t_acc - t_dec, t_dec, ProfileType::Trapezoidal)
        }
        else {
            let v_peak = 0.5 * (a_max * duration + v0);
            (v_peak, a_max, (v_peak - v0) / a_max, 0.0, v_peak / a_max, ProfileType::Triangular)
        };

        let d_acc = 0.5 * (v0 + v_cruise) * t_acc;
        let d_coast = v_cruise * t_coast;
        let d_total = d_acc + d_coast + 0.5 * v_cruise * t_dec;

        Self {
            initial_position,
            direction,
            v_start: v0,
            v_cruise,
            a_acc,
            a_dec: a_max,
            t_acc,
            t_coast,
            t_dec,
            d_acc,
            d_coast,
            d_total,
            profile_type,
        }
    }

    pub fn stationary(position: f32) -> Self {
        Self {
            initial_position: position,
            direction: 1.0,
            v_start: 0.0,
            v_cruise: 0.0,
            a_acc: 0.0,
            a_dec: 0.0,
            t_acc: 0.0,
            t_coast: 0.0,
            t_dec: 0.0,
            d_acc: 0.0,
            d_coast: 0.0,
            d_total: 0.0,
            profile_type: ProfileType::Trapezoidal,
        }
    }

    pub fn duration(&self) -> f32 {
        self.t_acc + self.t_coast + self.t_dec
    }

    pub fn final_position(&self) -> f32 {
        self.initial_position + self.direction * self.d_total
    }

    pub fn is_triangular(&self) -> bool {
        self.profile_type == ProfileType::Triangular
    }

    pub fn is_decelerating(&self) -> bool {
        self.profile_type == ProfileType::Decelerating
    }

    /// Reference position and speed `t` seconds after the profile start.
    pub fn reference(&self, t: f32) -> Reference {
        let t = t.max(0.0);

        if t >= self.duration() {
            return Reference {
                position: self.final_position(),
                speed: 0.0,
            };
        }

        let (travel, speed) = if t < self.t_acc {
            (self.v_start * t + 0.5 * self.a_acc * t * t, self.v_start + self.a_acc * t)
        }
        else if t < self.t_acc + self.t_coast {
            (self.d_acc + self.v_cruise * (t - self.t_acc), self.v_cruise)
        }
        else {
            let t_dec = t - self.t_acc - self.t_coast;
            (
                self.d_acc + self.d_coast + self.v_cruise * t_dec - 0.5 * self.a_dec * t_dec * t_dec,
                self.v_cruise - self.a_dec * t_dec,
            )
        };

        Reference {
            position: self.initial_position + self.direction * travel,
            speed: self.direction * speed,
        }
    }
}

fn sign(value: f32) -> f32 {
    if value < 0.0 { -1.0 } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-2
    }

    #[test]
    fn test_trapezoidal_profile() {
        let profile = TrapezoidProfile::new(0.0, 1000.0, 0.0, 500.0, 1000.0);
        assert!(!profile.is_triangular());
        assert!(close(profile.duration(), 2.5));

        let cruise = profile.reference(1.0);
        assert!(close(cruise.speed, 500.0));
        assert!(close(cruise.position, 375.0));

        let end = profile.reference(2.5);
        assert_eq!(end, Reference { position: 1000.0, speed: 0.0 });
    }

    #[test]
    fn test_reverse_direction() {
        let profile = TrapezoidProfile::new(100.0, -900.0, 0.0, 500.0, 1000.0);
        let cruise = profile.reference(1.0);
        assert!(close(cruise.speed, -500.0));
        assert!(close(cruise.position, -275.0));
        assert!(close(profile.reference(10.0).position, -900.0));
    }

    #[test]
    fn test_triangular_when_distance_is_short() {
        let profile = TrapezoidProfile::new(0.0, 100.0, 0.0, 500.0, 1000.0);
        assert!(profile.is_triangular());
        // Peak speed sqrt(a * d) reached halfway
        let peak = profile.reference(profile.duration() / 2.0);
        assert!(close(peak.speed, 316.23));
        assert!(close(peak.position, 50.0));
    }

    #[test]
    fn test_starts_from_current_speed() {
        let profile = TrapezoidProfile::new(0.0, 1000.0, 250.0, 500.0, 1000.0);
        let start = profile.reference(0.0);
        assert!(close(start.speed, 250.0));
        assert!(close(profile.duration(), 2.5 - 0.25 + 0.03125 * 2.0));
        assert!(close(profile.reference(profile.duration()).position, 1000.0));
    }

    #[test]
    fn test_decelerates_immediately_when_too_fast() {
        // Stopping from 500 at 1000 needs 125, only 50 left
        let profile = TrapezoidProfile::new(0.0, 50.0, 500.0, 500.0, 1000.0);
        assert!(profile.is_decelerating());
        assert!(profile.reference(0.01).speed < 500.0);
        assert!(close(profile.duration(), 0.2));
        assert!(close(profile.reference(0.2).position, 50.0));
    }

    #[test]
    fn test_zero_distance_is_stationary() {
        let profile = TrapezoidProfile::new(42.0, 42.0, 0.0, 500.0, 1000.0);
        assert_eq!(profile.duration(), 0.0);
        assert_eq!(profile.reference(0.5), Reference { position: 42.0, speed: 0.0 });
    }

    #[test]
    fn test_duration_profile() {
        let profile = TrapezoidProfile::for_duration(0.0, 2.0, 0.0, 400.0, 800.0);
        assert!(close(profile.duration(), 2.0));
        assert!(close(profile.reference(1.0).speed, 400.0));
        // 0.5 s ramps on both ends, 1 s cruise
        assert!(close(profile.final_position(), 600.0));
    }

    #[test]
    fn test_short_duration_is_triangular() {
        let profile = TrapezoidProfile::for_duration(0.0, 0.5, 0.0, -1000.0, 1000.0);
        assert!(profile.is_triangular());
        let peak = profile.reference(0.25);
        assert!(close(peak.speed, -250.0));
        assert!(close(profile.final_position(), -62.5));
    }
}
