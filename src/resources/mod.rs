/* 
* Resources Hub
*/

/* --------------------------- Library -------------------------- */
use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::waitqueue::WakerRegistration;

/* --------------------------- Declare Modules -------------------------- */
pub mod config;
pub mod driver_resources;
pub mod error;
pub mod logger_resources;
pub mod motor_resources;
pub mod macros;

pub use config::*;
pub use driver_resources::*;
pub use error::*;
pub use logger_resources::*;
pub use motor_resources::*;
