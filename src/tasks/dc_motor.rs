/*
* DC Motor Control
*  - One maneuver state machine per configured motor
*  - Control runs in motor counts (motor shaft degrees), commands arrive in
*    output shaft degrees and are scaled by the gear ratio
*/

use super::*;

// Resources
use crate::resources::config::LOG_VALUES;
use crate::resources::config::MAX_DUTY_PCT;
use crate::resources::config::MAX_LOOP_TIME_MS;
use crate::resources::config::SETTLE_TICKS;
use crate::resources::config::DEFAULT_DC_CONFIG;
use crate::resources::config::DEFAULT_PID_CONFIG;
use crate::resources::config::DEFAULT_RUN_CONFIG;
use crate::resources::motor_resources::ControlMode;
use crate::resources::motor_resources::DcSettings;
use crate::resources::motor_resources::Direction;
use crate::resources::motor_resources::MotorSettings;
use crate::resources::motor_resources::PidSettings;
use crate::resources::motor_resources::RunSettings;
use crate::resources::motor_resources::StopAction;
use crate::resources::error::MotorError;
use crate::resources::logger_resources::Logger;

// Control
use crate::control::ControlError;
use crate::control::PIDcontrol;
use crate::control::Reference;
use crate::control::StallDetector;
use crate::control::TrapezoidProfile;

/* --------------------------- Actuation -------------------------- */
/// What the driver should do with the motor this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Actuation {
    Coast,
    Brake,
    Duty(f32),
}

impl Actuation {
    fn oriented(self, direction: Direction) -> Self {
        match self {
            Actuation::Duty(duty) => Actuation::Duty(duty * direction.sign()),
            other => other,
        }
    }
}

/* --------------------------- Code -------------------------- */
pub struct MotorControl {
    direction: Direction,
    gear_ratio: f32,
    has_encoder: bool,
    settings: MotorSettings,
    mode: ControlMode,
    maneuver: u32,
    pid: PIDcontrol,
    stall: StallDetector,
    logger: Logger,
    profile: Option<TrapezoidProfile>,
    profile_start_ms: u32,
    replan: bool,
    start_ms: Option<u32>,
    reference: Reference,
    target_count: f32,
    hold_count: f32,
    count: f32,
    speed: f32,
    sampled: bool,
    sample_ms: u32,
    angle_offset: f32,
    duty: f32,
    pending: Actuation,
    settle_ticks: u32,
    stall_count: Option<f32>,
    duty_limit_override: Option<f32>,
    completed: bool,
}

impl MotorControl {
    pub fn new(direction: Direction, gear_ratio: f32, has_encoder: bool) -> Self {
        Self {
            direction,
            gear_ratio,
            has_encoder,
            settings: MotorSettings {
                dc: DEFAULT_DC_CONFIG,
                pid: DEFAULT_PID_CONFIG,
                run: DEFAULT_RUN_CONFIG,
            },
            mode: ControlMode::Idle,
            maneuver: 0,
            pid: PIDcontrol::new(),
            stall: StallDetector::new(),
            logger: Logger::new(LOG_VALUES),
            profile: None,
            profile_start_ms: 0,
            replan: false,
            start_ms: None,
            reference: Reference::default(),
            target_count: 0.0,
            hold_count: 0.0,
            count: 0.0,
            speed: 0.0,
            sampled: false,
            sample_ms: 0,
            angle_offset: 0.0,
            duty: 0.0,
            pending: Actuation::Coast,
            settle_ticks: 0,
            stall_count: None,
            duty_limit_override: None,
            completed: false,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Generation of the active mode, bumped on every mode entry.
    pub fn maneuver(&self) -> u32 {
        self.maneuver
    }

    pub fn has_encoder(&self) -> bool {
        self.has_encoder
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn gear_ratio(&self) -> f32 {
        self.gear_ratio
    }

    pub fn settings(&self) -> MotorSettings {
        self.settings
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    /// Last duty actually written to the driver, in percent.
    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// Stall latch of the active mode. Cleared on every mode entry, so it
    /// reads `false` once a run-until-stalled maneuver has stopped.
    pub fn is_stalled(&self) -> bool {
        self.stall.is_stalled()
    }

    /// Output ceiling in use: the maneuver's own limit, if any, else the
    /// configured stall torque limit.
    pub fn duty_limit(&self) -> f32 {
        self.duty_limit_override.unwrap_or(self.settings.dc.stall_torque_limit_pct)
    }

    /// Angle at which the last run-until-stalled maneuver stopped. Kept after
    /// the stall latch clears.
    pub fn stall_angle(&self) -> Option<i32> {
        self.stall_count.map(|count| self.user_angle(count))
    }

    /* --------------------------- Unit Conversion -------------------------- */
    fn user_angle(&self, count: f32) -> i32 {
        roundf((count + self.angle_offset) / self.gear_ratio) as i32
    }

    fn user_speed(&self, counts_per_s: f32) -> i32 {
        roundf(counts_per_s / self.gear_ratio) as i32
    }

    fn to_count(&self, angle: i32) -> f32 {
        angle as f32 * self.gear_ratio - self.angle_offset
    }

    /// Speed setpoint in counts per second, limited to the configured max speed.
    fn speed_setpoint(&self, speed: i32) -> f32 {
        let max_speed = self.settings.run.max_speed;
        speed.clamp(-max_speed, max_speed) as f32 * self.gear_ratio
    }

    fn loop_time_s(&self) -> f32 {
        self.settings.pid.loop_time_ms as f32 / 1000.0
    }

    /* --------------------------- Queries -------------------------- */
    pub fn angle(&self) -> Result<i32, MotorError> {
        self.require_encoder()?;
        Ok(self.user_angle(self.count))
    }

    pub fn speed(&self) -> Result<i32, MotorError> {
        self.require_encoder()?;
        Ok(self.user_speed(self.speed))
    }

    /// Redefines the current angle. Control keeps running on raw counts.
    pub fn reset_angle(&mut self, angle: i32) -> Result<(), MotorError> {
        self.require_encoder()?;
        self.angle_offset = angle as f32 * self.gear_ratio - self.count;
        Ok(())
    }

    fn require_encoder(&self) -> Result<(), MotorError> {
        if self.has_encoder {
            Ok(())
        }
        else {
            Err(MotorError::InvalidArgument)
        }
    }

    /* --------------------------- Settings -------------------------- */
    pub fn set_run_settings(&mut self, settings: RunSettings) -> Result<(), MotorError> {
        self.require_encoder()?;
        if settings.max_speed <= 0 || settings.acceleration <= 0 {
            return Err(MotorError::InvalidArgument);
        }

        self.settings.run = settings;
        Ok(())
    }

    pub fn set_dc_settings(&mut self, settings: DcSettings) -> Result<(), MotorError> {
        let limit = settings.stall_torque_limit_pct;
        let offset = settings.duty_offset_pct;
        if !(limit > 0.0 && limit <= MAX_DUTY_PCT) || !(offset >= 0.0 && offset < MAX_DUTY_PCT) {
            return Err(MotorError::InvalidArgument);
        }

        self.settings.dc = settings;
        Ok(())
    }

    pub fn set_pid_settings(&mut self, settings: PidSettings) -> Result<(), MotorError> {
        self.require_encoder()?;
        let gains_valid = [settings.kp, settings.ki, settings.kd]
            .iter()
            .all(|gain| gain.is_finite() && *gain >= 0.0);
        let limits_valid = settings.pos_tolerance >= 0
            && settings.speed_tolerance >= 0
            && settings.stall_speed_limit >= 0
            && settings.stall_time_ms > 0
            && (1..=MAX_LOOP_TIME_MS).contains(&settings.loop_time_ms);

        if !gains_valid || !limits_valid {
            return Err(MotorError::InvalidArgument);
        }

        self.settings.pid = settings;
        Ok(())
    }

    /* --------------------------- Commands -------------------------- */
    fn enter(&mut self, mode: ControlMode) -> u32 {
        self.mode = mode;
        self.maneuver = self.maneuver.wrapping_add(1);
        self.profile = None;
        self.replan = false;
        self.start_ms = None;
        self.settle_ticks = 0;
        self.pid.reset();
        self.stall.reset();
        self.duty_limit_override = None;
        self.maneuver
    }

    pub fn set_duty(&mut self, duty_pct: f32) -> Result<u32, MotorError> {
        if !duty_pct.is_finite() || fabsf(duty_pct) > MAX_DUTY_PCT {
            return Err(MotorError::InvalidArgument);
        }

        Ok(self.enter(ControlMode::Duty(duty_pct)))
    }

    pub fn run_at_speed(&mut self, speed: i32) -> Result<u32, MotorError> {
        self.require_encoder()?;
        Ok(self.enter(ControlMode::Speed { speed }))
    }

    pub fn run_for_duration(&mut self, speed: i32, duration_ms: i32, then: StopAction) -> Result<u32, MotorError> {
        self.require_encoder()?;
        let duration_ms = u32::try_from(duration_ms).map_err(|_| MotorError::InvalidArgument)?;
        Ok(self.enter(ControlMode::Timed { speed, duration_ms, then }))
    }

    pub fn run_angle(&mut self, speed: i32, angle: i32, then: StopAction) -> Result<u32, MotorError> {
        self.require_encoder()?;
        if speed == 0 {
            return Err(MotorError::InvalidArgument);
        }

        let delta = angle as f32 * self.gear_ratio * speed.signum() as f32;
        let maneuver = self.enter(ControlMode::Angle { speed, angle, then });
        self.target_count = self.count + delta;
        Ok(maneuver)
    }

    pub fn run_target(&mut self, speed: i32, target: i32, then: StopAction) -> Result<u32, MotorError> {
        self.require_encoder()?;
        if speed == 0 {
            return Err(MotorError::InvalidArgument);
        }

        let maneuver = self.enter(ControlMode::Target { speed, target, then });
        self.target_count = self.to_count(target);
        Ok(maneuver)
    }

    /// Moves the setpoint of an ongoing position maneuver, or starts holding
    /// at `target` when there is none.
    pub fn track_target(&mut self, target: i32) -> Result<u32, MotorError> {
        self.require_encoder()?;
        let count = self.to_count(target);

        match self.mode {
            ControlMode::Target { speed, then, .. } => {
                self.mode = ControlMode::Target { speed, target, then };
                self.target_count = count;
                self.profile = None;
                self.replan = self.start_ms.is_some();
                self.settle_ticks = 0;
            },
            ControlMode::Hold { .. } => {
                self.mode = ControlMode::Hold { target };
                self.hold_count = count;
            },
            ControlMode::Stopped(StopAction::Hold) => {
                self.hold_count = count;
            },
            _ => {
                self.enter(ControlMode::Hold { target });
                self.hold_count = count;
            }
        }

        Ok(self.maneuver)
    }

    /// `duty_limit` replaces the stall torque limit until the next mode
    /// entry, which includes the stop at the end of this maneuver.
    pub fn run_until_stalled(&mut self, speed: i32, then: StopAction, duty_limit: Option<f32>) -> Result<u32, MotorError> {
        self.require_encoder()?;
        if speed == 0 {
            return Err(MotorError::InvalidArgument);
        }
        if let Some(limit) = duty_limit {
            if !(limit > 0.0 && limit <= MAX_DUTY_PCT) {
                return Err(MotorError::InvalidArgument);
            }
        }

        self.stall_count = None;
        let maneuver = self.enter(ControlMode::UntilStalled { speed, then });
        self.duty_limit_override = duty_limit;
        Ok(maneuver)
    }

    pub fn stop(&mut self, action: StopAction) -> Result<u32, MotorError> {
        if action == StopAction::Hold {
            self.require_encoder()?;
            self.hold_count = self.count;
        }

        Ok(self.enter(ControlMode::Stopped(action)))
    }

    /* --------------------------- Control Tick -------------------------- */
    /// Advances the state machine by one tick and returns the actuation to
    /// write, already oriented for the driver.
    ///
    /// `raw_angle` is `None` for motors without an encoder. The actuation
    /// only becomes the motor's duty once `commit` confirms it was written.
    pub fn update(&mut self, now_ms: u32, raw_angle: Option<i32>) -> Actuation {
        if let Some(raw) = raw_angle {
            let count = raw as f32 * self.direction.sign();
            let elapsed_ms = now_ms.wrapping_sub(self.sample_ms);
            if !self.sampled {
                self.speed = 0.0;
            }
            else if elapsed_ms > 0 {
                self.speed = (count - self.count) * 1000.0 / elapsed_ms as f32;
            }
            self.count = count;
            self.sample_ms = now_ms;
            self.sampled = true;
        }

        let pid = self.settings.pid;
        let dc = self.settings.dc;
        self.pid.update_pid_param(pid.kp, pid.ki, pid.kd);
        self.pid.update_duty_limits(self.duty_limit(), dc.duty_offset_pct);

        let actuation = match self.mode {
            ControlMode::Idle | ControlMode::Stopped(StopAction::Coast) => self.passive(Actuation::Coast),
            ControlMode::Stopped(StopAction::Brake) => self.passive(Actuation::Brake),
            ControlMode::Duty(duty) => self.passive(Actuation::Duty(duty)),
            _ if !self.has_encoder => self.passive(Actuation::Coast),
            _ => self.feedback(now_ms),
        };

        self.pending = actuation;
        actuation.oriented(self.direction)
    }

    /// Records the actuation returned by the last `update` as written.
    pub fn commit(&mut self) {
        self.duty = match self.pending {
            Actuation::Duty(duty) => duty,
            Actuation::Coast | Actuation::Brake => 0.0,
        };
    }

    /// True once after the tick that finished a bounded maneuver.
    pub fn take_completed(&mut self) -> bool {
        core::mem::take(&mut self.completed)
    }

    /// Appends `[angle, speed, reference angle, reference speed, duty]` to the
    /// log, duty in hundredths of a percent.
    pub fn log_sample(&mut self, now_ms: u32) {
        if !self.logger.is_active() {
            return;
        }

        let values: [i32; LOG_VALUES] = [
            self.user_angle(self.count),
            self.user_speed(self.speed),
            self.user_angle(self.reference.position),
            self.user_speed(self.reference.speed),
            roundf(self.duty * 100.0) as i32,
        ];
        self.logger.update(now_ms, &values);
    }

    fn passive(&mut self, actuation: Actuation) -> Actuation {
        self.reference = Reference {
            position: self.count,
            speed: self.speed,
        };
        self.stall.reset();
        actuation
    }

    fn feedback(&mut self, now_ms: u32) -> Actuation {
        let dt = self.loop_time_s();
        let first = self.start_ms.is_none();
        let start_ms = *self.start_ms.get_or_insert(now_ms);
        let elapsed_ms = now_ms.wrapping_sub(start_ms);

        let reference = match self.mode {
            ControlMode::Speed { speed } | ControlMode::UntilStalled { speed, .. } => {
                let speed = self.speed_setpoint(speed);
                let position = if first {
                    self.count
                }
                else if self.stall.is_stalled() {
                    self.reference.position
                }
                else {
                    self.reference.position + speed * dt
                };
                Reference {
                    position: self.limit_lead(position),
                    speed,
                }
            },
            ControlMode::Hold { .. } | ControlMode::Stopped(StopAction::Hold) => Reference {
                position: self.hold_count,
                speed: 0.0,
            },
            _ => self.profile_reference(now_ms),
        };

        let error = ControlError {
            position: reference.position - self.count,
            speed: reference.speed - self.speed,
        };
        let duty = if self.mode.is_speed_control() {
            self.pid.compute_speed(error)
        }
        else {
            self.pid.compute(error, dt)
        };

        let pid = self.settings.pid;
        let stall_speed = pid.stall_speed_limit as f32 * self.gear_ratio;
        let stalled = self.stall.update(reference.speed, self.speed, stall_speed, pid.loop_time_ms, pid.stall_time_ms);
        self.reference = reference;

        match self.mode {
            ControlMode::Timed { duration_ms, then, .. } if elapsed_ms >= duration_ms => {
                self.complete(then, self.count, duty)
            },
            ControlMode::Angle { then, .. } | ControlMode::Target { then, .. } => {
                if self.is_on_target(now_ms) {
                    self.settle_ticks += 1;
                }
                else {
                    self.settle_ticks = 0;
                }

                if self.settle_ticks >= SETTLE_TICKS {
                    self.complete(then, self.target_count, duty)
                }
                else {
                    Actuation::Duty(duty)
                }
            },
            ControlMode::UntilStalled { then, .. } if stalled => {
                self.stall_count = Some(self.count);
                self.complete(then, self.count, duty)
            },
            _ => Actuation::Duty(duty),
        }
    }

    /// Keeps a speed reference within the distance that already saturates
    /// the output, so a blocked motor does not build up a backlog.
    fn limit_lead(&self, position: f32) -> f32 {
        let kp = self.settings.pid.kp;
        if kp <= 0.0 {
            return position;
        }

        let max_lead = self.duty_limit() / kp;
        position.clamp(self.count - max_lead, self.count + max_lead)
    }

    fn profile_reference(&mut self, now_ms: u32) -> Reference {
        let profile = match self.profile {
            Some(profile) => profile,
            None => {
                let profile = self.plan();
                self.profile = Some(profile);
                self.profile_start_ms = now_ms;
                profile
            }
        };

        profile.reference(self.profile_elapsed_s(now_ms))
    }

    fn profile_elapsed_s(&self, now_ms: u32) -> f32 {
        now_ms.wrapping_sub(self.profile_start_ms) as f32 / 1000.0
    }

    /// Plans from the measured state, or from the last reference when an
    /// ongoing maneuver got a new target.
    fn plan(&mut self) -> TrapezoidProfile {
        let (from, v_from) = if self.replan {
            (self.reference.position, self.reference.speed)
        }
        else {
            (self.count, self.speed)
        };
        self.replan = false;

        let acceleration = self.settings.run.acceleration as f32 * self.gear_ratio;
        match self.mode {
            ControlMode::Timed { speed, duration_ms, .. } => {
                TrapezoidProfile::for_duration(from, duration_ms as f32 / 1000.0, v_from, self.speed_setpoint(speed), acceleration)
            },
            ControlMode::Angle { speed, .. } | ControlMode::Target { speed, .. } => {
                TrapezoidProfile::new(from, self.target_count, v_from, fabsf(self.speed_setpoint(speed)), acceleration)
            },
            _ => TrapezoidProfile::stationary(from),
        }
    }

    fn is_on_target(&self, now_ms: u32) -> bool {
        let Some(profile) = self.profile else {
            return false;
        };

        let pid = self.settings.pid;
        let pos_tolerance = pid.pos_tolerance as f32 * self.gear_ratio;
        let speed_tolerance = pid.speed_tolerance as f32 * self.gear_ratio;

        self.profile_elapsed_s(now_ms) >= profile.duration()
            && fabsf(self.target_count - self.count) <= pos_tolerance
            && fabsf(self.speed) <= speed_tolerance
    }

    fn complete(&mut self, then: StopAction, hold_count: f32, duty: f32) -> Actuation {
        log::debug!("maneuver {} done at {} deg", self.maneuver, self.user_angle(self.count));

        self.hold_count = hold_count;
        self.enter(ControlMode::Stopped(then));
        self.completed = true;

        match then {
            StopAction::Coast => Actuation::Coast,
            StopAction::Brake => Actuation::Brake,
            StopAction::Hold => Actuation::Duty(duty),
        }
    }
}
