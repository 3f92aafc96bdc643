pub mod loop_worker;
pub mod sensor;

pub use loop_worker::sensing_loop;
pub use sensor::{MotionSensor, SysfsMotionSensor};
