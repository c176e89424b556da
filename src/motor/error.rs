use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotorError {
    #[error("motor {motor}: angle {angle} out of range [{min}, {max}]")]
    OutOfRange {
        motor: u8,
        angle: i32,
        min: i32,
        max: i32,
    },
    #[error("motor {motor}: angle {angle} does not fit in a command byte")]
    Unencodable { motor: u8, angle: i32 },
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("transport write failed: {0}")]
    Io(#[from] std::io::Error),
}
