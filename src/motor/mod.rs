mod controller;
mod error;
mod motor;
mod transport;

pub use controller::{Axis, MotorController, MountLimits};
pub use error::MotorError;
pub use motor::{Motor, MotorConfig};
pub use transport::{SerialTransport, Transport};

#[cfg(test)]
pub(crate) use transport::mock;
