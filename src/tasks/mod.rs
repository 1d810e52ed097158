/*
* Tasks
*/

/* --------------------------- Library -------------------------- */
use libm::fabsf;
use libm::roundf;

/* --------------------------- Declare Modules -------------------------- */
pub mod dc_motor;
pub mod control_loop;

#[cfg(test)]
pub(crate) mod sim_motor;
