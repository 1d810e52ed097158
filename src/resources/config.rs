/*
*  Default Motor Config
*
*  Units
*  - Angles in output shaft degrees, speeds in deg/s, acceleration in deg/s^2
*  - Raw encoder counts are motor shaft degrees
*  - PID gains are duty percent per motor shaft degree (kp), per degree second (ki),
*    per degree per second (kd)
*/

use super::*;

/* --------------------------- Motor PID Config -------------------------- */
pub const DEFAULT_PID_CONFIG: PidSettings = PidSettings {
    kp: 0.4,
    ki: 0.2,
    kd: 0.04,
    loop_time_ms: 10,
    pos_tolerance: 10,
    speed_tolerance: 20,
    stall_speed_limit: 5,
    stall_time_ms: 200,
};

/* --------------------------- Motor Run Config -------------------------- */
pub const DEFAULT_RUN_CONFIG: RunSettings = RunSettings {
    max_speed: 1000,
    acceleration: 2000,
};

/* --------------------------- Motor DC Config -------------------------- */
pub const DEFAULT_DC_CONFIG: DcSettings = DcSettings {
    stall_torque_limit_pct: 100.0,
    duty_offset_pct: 0.0,
};

/* --------------------------- Motor Steady-State Criteria -------------------------- */
pub const SETTLE_TICKS: u32 = 3;

/* --------------------------- Motor Duty and Control Limits -------------------------- */
pub const MAX_DUTY_PCT: f32 = 100.0;
pub const MAX_INTEGRAL_DUTY: f32 = 20.0; // Largest duty share the integrator may hold
pub const MAX_LOOP_TIME_MS: u32 = 100;

/* --------------------------- Logger -------------------------- */
pub const LOG_VALUES: usize = 5; // angle, speed, reference angle, reference speed, duty
pub const LOG_COLUMNS: usize = LOG_VALUES + 1; // Elapsed time comes first
pub const MAX_LOG_COLUMNS: usize = 8;
