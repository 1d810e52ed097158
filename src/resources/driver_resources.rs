/*
    Driver Resources

    Everything the control core needs from the outside world. Implementations
    live with the platform bring-up code.
*/

use super::*;

/* --------------------------- Port -------------------------- */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Port {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
    F = 5,
}

/* --------------------------- Collaborators -------------------------- */
/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Raw rotation sensor, in encoder counts (motor shaft degrees).
pub trait AngleSensor {
    fn read_raw_angle(&mut self, port: Port) -> Result<i32, DriverFault>;
}

/// Duty cycle actuation sink.
///
/// `duty_pct` is a signed percentage in `-100.0..=100.0`. A duty of zero
/// shorts the motor terminals, which is how `brake` works by default.
pub trait MotorDriver {
    fn set_duty(&mut self, port: Port, duty_pct: f32) -> Result<(), DriverFault>;

    fn coast(&mut self, port: Port) -> Result<(), DriverFault>;

    fn brake(&mut self, port: Port) -> Result<(), DriverFault> {
        self.set_duty(port, 0.0)
    }
}
