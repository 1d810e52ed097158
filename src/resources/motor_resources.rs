/*
    DC Motor Resources
*/

use super::*;

use core::future::poll_fn;
use core::task::Poll;

use crate::control::resolve_gear_ratio;
use crate::control::GearItem;
use crate::tasks::dc_motor::Actuation;
use crate::tasks::dc_motor::MotorControl;

/* --------------------------- Motor Command -------------------------- */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Clockwise => 1.0,
            Direction::CounterClockwise => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopAction {
    Coast,
    Brake,
    Hold,
}

/// Active mode of a motor, with the request in output shaft units.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    Idle,
    Duty(f32),
    Speed { speed: i32 },
    Timed { speed: i32, duration_ms: u32, then: StopAction },
    Angle { speed: i32, angle: i32, then: StopAction },
    Target { speed: i32, target: i32, then: StopAction },
    UntilStalled { speed: i32, then: StopAction },
    Hold { target: i32 },
    Stopped(StopAction),
}

impl ControlMode {
    /// Maneuvers that end on their own and can be waited for.
    pub fn is_bounded(&self) -> bool {
        matches!(
            self,
            ControlMode::Timed { .. } | ControlMode::Angle { .. } | ControlMode::Target { .. } | ControlMode::UntilStalled { .. }
        )
    }

    pub fn is_feedback(&self) -> bool {
        !matches!(
            self,
            ControlMode::Idle | ControlMode::Duty(_) | ControlMode::Stopped(StopAction::Coast) | ControlMode::Stopped(StopAction::Brake)
        )
    }

    pub fn is_speed_control(&self) -> bool {
        matches!(self, ControlMode::Speed { .. } | ControlMode::UntilStalled { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorStatus {
    Idle,
    Running,
    Stalled,
    Stopped(StopAction),
}

/* --------------------------- Motor Settings -------------------------- */
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DcSettings {
    pub stall_torque_limit_pct: f32,
    pub duty_offset_pct: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidSettings {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub loop_time_ms: u32,
    pub pos_tolerance: i32,
    pub speed_tolerance: i32,
    pub stall_speed_limit: i32,
    pub stall_time_ms: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunSettings {
    pub max_speed: i32,
    pub acceleration: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorSettings {
    pub dc: DcSettings,
    pub pid: PidSettings,
    pub run: RunSettings,
}

impl fmt::Display for MotorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run settings")?;
        writeln!(f, "  max speed       {} deg/s", self.run.max_speed)?;
        writeln!(f, "  acceleration    {} deg/s/s", self.run.acceleration)?;
        writeln!(f, "DC settings")?;
        writeln!(f, "  stall torque    {:.1} %", self.dc.stall_torque_limit_pct)?;
        writeln!(f, "  duty offset     {:.1} %", self.dc.duty_offset_pct)?;
        writeln!(f, "PID settings")?;
        writeln!(f, "  kp, ki, kd      {}, {}, {}", self.pid.kp, self.pid.ki, self.pid.kd)?;
        writeln!(f, "  loop time       {} ms", self.pid.loop_time_ms)?;
        writeln!(f, "  tolerances      {} deg, {} deg/s", self.pid.pos_tolerance, self.pid.speed_tolerance)?;
        write!(f, "  stall           {} deg/s for {} ms", self.pid.stall_speed_limit, self.pid.stall_time_ms)
    }
}

/* --------------------------- Motor Struct -------------------------- */
struct MotorSlot {
    control: Option<MotorControl>,
    waker: WakerRegistration,
}

/// Command interface of one motor port.
///
/// Commands and the control tick share one critical-section lock. Commands
/// only hold it to validate and swap the mode; waiting for a maneuver to end
/// happens outside of it.
pub struct MotorHandler {
    port: Port,
    slot: Mutex<CriticalSectionRawMutex, RefCell<MotorSlot>>,
}

impl MotorHandler {
    pub const fn new(port: Port) -> Self {
        Self {
            port,
            slot: Mutex::new(RefCell::new(MotorSlot {
                control: None,
                waker: WakerRegistration::new(),
            })),
        }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    fn with_control<R>(&self, f: impl FnOnce(&mut MotorControl) -> Result<R, MotorError>) -> Result<R, MotorError> {
        self.slot.lock(|slot| -> Result<R, MotorError> {
            let mut slot = slot.borrow_mut();
            let control = slot.control.as_mut().ok_or(MotorError::NotConfigured)?;
            f(control)
        })
    }

    /// Runs a mode change and wakes whoever waits on the maneuver it replaces.
    fn command(&self, f: impl FnOnce(&mut MotorControl) -> Result<u32, MotorError>) -> Result<u32, MotorError> {
        self.slot.lock(|slot| -> Result<u32, MotorError> {
            let mut slot = slot.borrow_mut();
            let control = slot.control.as_mut().ok_or(MotorError::NotConfigured)?;
            let maneuver = f(control)?;
            slot.waker.wake();
            Ok(maneuver)
        })
    }

    async fn wait_for_completion(&self, maneuver: u32) {
        poll_fn(|cx| {
            self.slot.lock(|slot| {
                let mut slot = slot.borrow_mut();
                let running = slot
                    .control
                    .as_ref()
                    .is_some_and(|control| control.maneuver() == maneuver && control.mode().is_bounded());

                if running {
                    slot.waker.register(cx.waker());
                    Poll::Pending
                }
                else {
                    Poll::Ready(())
                }
            })
        })
        .await
    }

    /* --------------------------- Setup -------------------------- */
    /// Sets up an encoded motor. `gears` defaults to a direct drive.
    pub fn configure(&self, direction: Direction, gears: Option<&[GearItem]>) -> Result<(), MotorError> {
        let gear_ratio = match gears {
            Some(gears) => resolve_gear_ratio(gears)?,
            None => 1.0,
        };

        self.install(MotorControl::new(direction, gear_ratio, true));
        log::info!("motor {:?} configured, {:?}, gear ratio {}", self.port, direction, gear_ratio);
        Ok(())
    }

    /// Sets up a motor without encoder: duty and coast/brake only.
    pub fn configure_dc(&self, direction: Direction) -> Result<(), MotorError> {
        self.install(MotorControl::new(direction, 1.0, false));
        log::info!("motor {:?} configured as plain dc motor, {:?}", self.port, direction);
        Ok(())
    }

    fn install(&self, control: MotorControl) {
        self.slot.lock(|slot| {
            let mut slot = slot.borrow_mut();
            slot.control = Some(control);
            slot.waker.wake();
        });
    }

    /* --------------------------- Commands -------------------------- */
    pub fn set_duty(&self, duty_pct: f32) -> Result<(), MotorError> {
        self.command(|control| control.set_duty(duty_pct)).map(|_| ())
    }

    pub fn run_at_speed(&self, speed: i32) -> Result<(), MotorError> {
        self.command(|control| control.run_at_speed(speed)).map(|_| ())
    }

    pub async fn run_for_duration(&self, speed: i32, duration_ms: i32, then: StopAction, wait: bool) -> Result<(), MotorError> {
        let maneuver = self.command(|control| control.run_for_duration(speed, duration_ms, then))?;
        if wait {
            self.wait_for_completion(maneuver).await;
        }
        Ok(())
    }

    pub async fn run_to_relative_angle(&self, speed: i32, angle: i32, then: StopAction, wait: bool) -> Result<(), MotorError> {
        let maneuver = self.command(|control| control.run_angle(speed, angle, then))?;
        if wait {
            self.wait_for_completion(maneuver).await;
        }
        Ok(())
    }

    pub async fn run_to_absolute_target(&self, speed: i32, target: i32, then: StopAction, wait: bool) -> Result<(), MotorError> {
        let maneuver = self.command(|control| control.run_target(speed, target, then))?;
        if wait {
            self.wait_for_completion(maneuver).await;
        }
        Ok(())
    }

    pub fn track_target(&self, target: i32) -> Result<(), MotorError> {
        self.command(|control| control.track_target(target)).map(|_| ())
    }

    /// Runs until the motor stalls and returns the angle where it did.
    ///
    /// `duty_limit` replaces the stall torque limit for this maneuver only.
    /// The control tick drops it when the maneuver ends or is replaced, also
    /// when this future is dropped early.
    pub async fn run_until_stalled(&self, speed: i32, then: StopAction, duty_limit: Option<f32>) -> Result<i32, MotorError> {
        let maneuver = self.command(|control| control.run_until_stalled(speed, then, duty_limit))?;

        self.wait_for_completion(maneuver).await;

        self.with_control(|control| match control.stall_angle() {
            Some(angle) if control.maneuver() == maneuver.wrapping_add(1) => Ok(angle),
            _ => control.angle(),
        })
    }

    pub fn stop(&self, action: StopAction) -> Result<(), MotorError> {
        self.command(|control| control.stop(action)).map(|_| ())
    }

    /* --------------------------- Queries -------------------------- */
    pub fn angle(&self) -> Result<i32, MotorError> {
        self.with_control(|control| control.angle())
    }

    pub fn speed(&self) -> Result<i32, MotorError> {
        self.with_control(|control| control.speed())
    }

    pub fn is_stalled(&self) -> Result<bool, MotorError> {
        self.with_control(|control| Ok(control.is_stalled()))
    }

    pub fn reset_angle(&self, angle: i32) -> Result<(), MotorError> {
        self.with_control(|control| control.reset_angle(angle))
    }

    pub fn mode(&self) -> Result<ControlMode, MotorError> {
        self.with_control(|control| Ok(control.mode()))
    }

    pub fn status(&self) -> Result<MotorStatus, MotorError> {
        self.with_control(|control| {
            let mode = control.mode();
            let status = match mode {
                ControlMode::Idle => MotorStatus::Idle,
                ControlMode::Stopped(action) => MotorStatus::Stopped(action),
                _ if mode.is_feedback() && control.is_stalled() => MotorStatus::Stalled,
                _ => MotorStatus::Running,
            };
            Ok(status)
        })
    }

    pub fn duty(&self) -> Result<f32, MotorError> {
        self.with_control(|control| Ok(control.duty()))
    }

    pub fn gear_ratio(&self) -> Result<f32, MotorError> {
        self.with_control(|control| Ok(control.gear_ratio()))
    }

    pub fn settings(&self) -> Result<MotorSettings, MotorError> {
        self.with_control(|control| Ok(control.settings()))
    }

    pub fn loop_time_ms(&self) -> Result<u32, MotorError> {
        self.with_control(|control| Ok(control.settings().pid.loop_time_ms))
    }

    /* --------------------------- Settings -------------------------- */
    pub fn set_run_settings(&self, max_speed: i32, acceleration: i32) -> Result<(), MotorError> {
        self.with_control(|control| control.set_run_settings(RunSettings { max_speed, acceleration }))
    }

    pub fn run_settings(&self) -> Result<RunSettings, MotorError> {
        self.with_control(|control| Ok(control.settings().run))
    }

    pub fn set_dc_settings(&self, stall_torque_limit_pct: f32, duty_offset_pct: f32) -> Result<(), MotorError> {
        self.with_control(|control| control.set_dc_settings(DcSettings { stall_torque_limit_pct, duty_offset_pct }))
    }

    pub fn dc_settings(&self) -> Result<DcSettings, MotorError> {
        self.with_control(|control| Ok(control.settings().dc))
    }

    /// Output ceiling the control tick applies right now, in percent.
    pub fn duty_limit(&self) -> Result<f32, MotorError> {
        self.with_control(|control| Ok(control.duty_limit()))
    }

    pub fn set_pid_settings(&self, settings: PidSettings) -> Result<(), MotorError> {
        self.with_control(|control| control.set_pid_settings(settings))
    }

    pub fn pid_settings(&self) -> Result<PidSettings, MotorError> {
        self.with_control(|control| Ok(control.settings().pid))
    }

    /* --------------------------- Logger -------------------------- */
    /// Starts sampling every `sample_div`-th tick into `buf`, at most `rows` rows.
    pub fn log_start<C: Clock>(&self, buf: &'static mut [i32], rows: usize, sample_div: u32, clock: &C) -> Result<(), MotorError> {
        let now_ms = clock.now_ms();
        self.with_control(|control| control.logger_mut().start(buf, rows, sample_div, now_ms))
    }

    pub fn log_stop(&self) -> Result<(), MotorError> {
        self.with_control(|control| {
            control.logger_mut().stop();
            Ok(())
        })
    }

    pub fn log_rows(&self) -> Result<usize, MotorError> {
        self.with_control(|control| Ok(control.logger().rows()))
    }

    pub fn log_cols(&self) -> Result<usize, MotorError> {
        self.with_control(|control| Ok(control.logger().cols()))
    }

    /// Copy of one logged row, `-1` for the latest.
    pub fn log_read(&self, index: i32) -> Result<heapless::Vec<i32, MAX_LOG_COLUMNS>, MotorError> {
        self.with_control(|control| {
            let row = control.logger().read(index)?;
            heapless::Vec::from_slice(row).map_err(|_| MotorError::InvalidArgument)
        })
    }

    /* --------------------------- Control Tick -------------------------- */
    /// One control period: sample, advance the maneuver, actuate, log.
    ///
    /// Sensor and driver calls run outside the lock. A sensor or driver
    /// failure ends the tick with `HardwareFault` and leaves the last written
    /// duty in place. The next tick starts over.
    pub fn control_tick<S: AngleSensor, D: MotorDriver>(&self, now_ms: u32, sensor: &mut S, driver: &mut D) -> Result<(), MotorError> {
        let port = self.port;

        let raw_angle = if self.with_control(|control| Ok(control.has_encoder()))? {
            Some(sensor.read_raw_angle(port)?)
        }
        else {
            None
        };

        let actuation = self.slot.lock(|slot| -> Result<Actuation, MotorError> {
            let mut slot = slot.borrow_mut();
            let slot = &mut *slot;
            let control = slot.control.as_mut().ok_or(MotorError::NotConfigured)?;

            let actuation = control.update(now_ms, raw_angle);
            if control.take_completed() {
                slot.waker.wake();
            }
            Ok(actuation)
        })?;

        match actuation {
            Actuation::Coast => driver.coast(port)?,
            Actuation::Brake => driver.brake(port)?,
            Actuation::Duty(duty) => driver.set_duty(port, duty)?,
        }

        self.with_control(|control| {
            control.commit();
            control.log_sample(now_ms);
            Ok(())
        })
    }
}
