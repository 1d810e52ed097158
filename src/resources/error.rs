/*
    Error Resources
*/

use core::fmt;

/* --------------------------- Driver Fault -------------------------- */
/// Failure reported by a sensor or actuation driver.
///
/// The control core never interprets these; they are handed back to the
/// caller as `MotorError::HardwareFault` exactly as the driver produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverFault {
    Io,
    Timeout,
    NoDevice,
    InvalidPort,
    Other(i32),
}

/* --------------------------- Motor Error -------------------------- */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError {
    /// Bad gear train, stop action, log index or settings value
    InvalidArgument,
    /// Operation on a motor that was never configured
    NotConfigured,
    /// Driver-reported I/O failure
    HardwareFault(DriverFault),
}

impl From<DriverFault> for MotorError {
    fn from(fault: DriverFault) -> Self {
        MotorError::HardwareFault(fault)
    }
}

impl fmt::Display for DriverFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverFault::Io => write!(f, "i/o error"),
            DriverFault::Timeout => write!(f, "timed out"),
            DriverFault::NoDevice => write!(f, "no device"),
            DriverFault::InvalidPort => write!(f, "invalid port"),
            DriverFault::Other(code) => write!(f, "driver error {}", code),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::InvalidArgument => write!(f, "invalid argument"),
            MotorError::NotConfigured => write!(f, "motor not configured"),
            MotorError::HardwareFault(fault) => write!(f, "hardware fault: {}", fault),
        }
    }
}
