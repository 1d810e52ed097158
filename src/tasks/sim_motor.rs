/*
    Simulated Motor

    First order plant used by the host tests: at full duty the shaft settles
    at 1000 counts/s within a few ticks. Also stands in for the sensor and
    driver of the hub, with switchable faults.
*/

use core::cell::Cell;
use core::cell::RefCell;

use libm::roundf;

use crate::resources::AngleSensor;
use crate::resources::DriverFault;
use crate::resources::MotorDriver;
use crate::resources::Port;
use crate::tasks::dc_motor::Actuation;

const COUNTS_PER_S_PER_PCT: f32 = 10.0;
const RESPONSE: f32 = 0.5;
const COAST_DECAY: f32 = 0.9;

/* --------------------------- Plant -------------------------- */
pub struct Plant {
    angle: f32,
    velocity: f32,
    actuation: Option<Actuation>,
    jammed: bool,
}

impl Plant {
    pub const fn new() -> Self {
        Self {
            angle: 0.0,
            velocity: 0.0,
            actuation: None,
            jammed: false,
        }
    }

    pub fn raw_angle(&self) -> i32 {
        roundf(self.angle) as i32
    }

    pub fn actuation(&self) -> Option<Actuation> {
        self.actuation
    }

    pub fn apply(&mut self, actuation: Actuation) {
        self.actuation = Some(actuation);
    }

    pub fn jam(&mut self) {
        self.jammed = true;
        self.velocity = 0.0;
    }

    pub fn release(&mut self) {
        self.jammed = false;
    }

    pub fn step(&mut self, dt: f32) {
        match self.actuation {
            Some(Actuation::Duty(duty)) => self.velocity += (COUNTS_PER_S_PER_PCT * duty - self.velocity) * RESPONSE,
            Some(Actuation::Brake) => self.velocity -= self.velocity * RESPONSE,
            Some(Actuation::Coast) | None => self.velocity *= COAST_DECAY,
        }

        if self.jammed {
            self.velocity = 0.0;
        }

        self.angle += self.velocity * dt;
    }
}

/* --------------------------- Hub -------------------------- */
/// One plant per port, shared by the sensor and driver sides.
pub struct SimHub {
    plants: RefCell<[Plant; 6]>,
    writes: RefCell<[u32; 6]>,
    pub failing_reads: Cell<u32>,
    pub failing_writes: Cell<u32>,
}

impl SimHub {
    pub const fn new() -> Self {
        Self {
            plants: RefCell::new([Plant::new(), Plant::new(), Plant::new(), Plant::new(), Plant::new(), Plant::new()]),
            writes: RefCell::new([0; 6]),
            failing_reads: Cell::new(0),
            failing_writes: Cell::new(0),
        }
    }

    pub fn step(&self, port: Port, dt: f32) {
        self.plants.borrow_mut()[port as usize].step(dt);
    }

    pub fn jam(&self, port: Port) {
        self.plants.borrow_mut()[port as usize].jam();
    }

    pub fn raw_angle(&self, port: Port) -> i32 {
        self.plants.borrow()[port as usize].raw_angle()
    }

    pub fn actuation(&self, port: Port) -> Option<Actuation> {
        self.plants.borrow()[port as usize].actuation()
    }

    pub fn writes(&self, port: Port) -> u32 {
        self.writes.borrow()[port as usize]
    }

    fn write(&self, port: Port, actuation: Actuation) -> Result<(), DriverFault> {
        if take_failure(&self.failing_writes) {
            return Err(DriverFault::Timeout);
        }

        self.writes.borrow_mut()[port as usize] += 1;
        self.plants.borrow_mut()[port as usize].apply(actuation);
        Ok(())
    }
}

fn take_failure(counter: &Cell<u32>) -> bool {
    let remaining = counter.get();
    if remaining == 0 {
        return false;
    }

    counter.set(remaining - 1);
    true
}

impl AngleSensor for &SimHub {
    fn read_raw_angle(&mut self, port: Port) -> Result<i32, DriverFault> {
        if take_failure(&self.failing_reads) {
            return Err(DriverFault::Io);
        }

        Ok(self.raw_angle(port))
    }
}

impl MotorDriver for &SimHub {
    fn set_duty(&mut self, port: Port, duty_pct: f32) -> Result<(), DriverFault> {
        self.write(port, Actuation::Duty(duty_pct))
    }

    fn coast(&mut self, port: Port) -> Result<(), DriverFault> {
        self.write(port, Actuation::Coast)
    }

    fn brake(&mut self, port: Port) -> Result<(), DriverFault> {
        self.write(port, Actuation::Brake)
    }
}
