/*
* Hub Motor Control Engine
*  - Maneuver state machine for geared DC motors with rotary encoders
*  - PID control, trapezoidal motion profile, stall detection
*  - Fixed-capacity telemetry logger sampled from the control loop
*/

#![cfg_attr(not(test), no_std)]

// Mod
pub mod control;
pub mod resources;
pub mod tasks;

// Re-exports
pub use crate::control::GearItem;
pub use crate::resources::Clock;
pub use crate::resources::AngleSensor;
pub use crate::resources::MotorDriver;
pub use crate::resources::DriverFault;
pub use crate::resources::MotorError;
pub use crate::resources::MotorHandler;
pub use crate::resources::ControlMode;
pub use crate::resources::MotorStatus;
pub use crate::resources::Direction;
pub use crate::resources::StopAction;
pub use crate::resources::Port;
pub use crate::tasks::control_loop::control_task;
pub use crate::tasks::control_loop::EmbassyClock;
