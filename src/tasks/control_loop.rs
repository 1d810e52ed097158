/*
* Control Loop Task
*  - Runs the control tick of one motor on a fixed period
*  - The period follows the motor's loop time and is picked up between ticks
*/

// Resources
use crate::resources::config::DEFAULT_PID_CONFIG;
use crate::resources::driver_resources::AngleSensor;
use crate::resources::driver_resources::Clock;
use crate::resources::driver_resources::MotorDriver;
use crate::resources::error::MotorError;
use crate::resources::motor_resources::MotorHandler;

// Library
use embassy_time::Duration;
use embassy_time::Instant;
use embassy_time::Ticker;

/* --------------------------- Clock -------------------------- */
/// Millisecond clock backed by the embassy time driver.
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

/* --------------------------- Code -------------------------- */
pub async fn control_task<C: Clock, S: AngleSensor, D: MotorDriver>(motor: &MotorHandler, clock: &C, sensor: &mut S, driver: &mut D) {
    let mut loop_time_ms = motor.loop_time_ms().unwrap_or(DEFAULT_PID_CONFIG.loop_time_ms);
    let mut ticker = Ticker::every(Duration::from_millis(loop_time_ms as u64));

    log::info!("control loop for motor {:?} running every {} ms", motor.port(), loop_time_ms);

    loop {
        match motor.control_tick(clock.now_ms(), sensor, driver) {
            Ok(()) | Err(MotorError::NotConfigured) => {},
            Err(err) => log::warn!("motor {:?} tick aborted: {}", motor.port(), err),
        }

        let new_loop_time_ms = motor.loop_time_ms().unwrap_or(loop_time_ms);
        if new_loop_time_ms != loop_time_ms {
            loop_time_ms = new_loop_time_ms;
            ticker = Ticker::every(Duration::from_millis(loop_time_ms as u64));
            log::debug!("motor {:?} loop time now {} ms", motor.port(), loop_time_ms);
        }

        ticker.next().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embassy_futures::block_on;
    use embassy_futures::select::select;
    use embassy_time::Timer;

    use crate::resources::motor_resources::Direction;
    use crate::resources::driver_resources::Port;
    use crate::tasks::dc_motor::Actuation;
    use crate::tasks::sim_motor::SimHub;

    #[test]
    fn test_control_task_drives_configured_motor_only() {
        let motors = crate::create_motors!(Port::A, Port::B);
        let hub = SimHub::new();
        motors[0].configure(Direction::Clockwise, None).unwrap();
        motors[0].set_duty(40.0).unwrap();

        let mut sensor = &hub;
        let mut driver = &hub;
        let mut idle_sensor = &hub;
        let mut idle_driver = &hub;

        block_on(select(
            select(
                control_task(&motors[0], &EmbassyClock, &mut sensor, &mut driver),
                control_task(&motors[1], &EmbassyClock, &mut idle_sensor, &mut idle_driver),
            ),
            Timer::after_millis(100),
        ));

        assert!(hub.writes(Port::A) >= 2);
        assert_eq!(hub.actuation(Port::A), Some(Actuation::Duty(40.0)));
        assert_eq!(hub.writes(Port::B), 0);
    }

    #[test]
    fn test_control_task_survives_hardware_faults() {
        let motors = crate::create_motors!(Port::C);
        let hub = SimHub::new();
        motors[0].configure(Direction::Clockwise, None).unwrap();
        motors[0].set_duty(-20.0).unwrap();
        hub.failing_reads.set(3);

        let mut sensor = &hub;
        let mut driver = &hub;
        block_on(select(
            control_task(&motors[0], &EmbassyClock, &mut sensor, &mut driver),
            Timer::after_millis(100),
        ));

        assert_eq!(hub.failing_reads.get(), 0);
        assert!(hub.writes(Port::C) >= 1);
        assert_eq!(motors[0].duty(), Ok(-20.0));
    }
}
