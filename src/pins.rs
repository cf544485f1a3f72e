//! GPIO / peripheral pin assignments for the camera board.
//!
//! Single source of truth: `main.rs` references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// MLX90640 thermal sensor (I²C)
// ---------------------------------------------------------------------------

/// I²C data line. ESP32 default SDA.
pub const SENSOR_SDA_GPIO: i32 = 21;
/// I²C clock line. ESP32 default SCL.
pub const SENSOR_SCL_GPIO: i32 = 22;
/// I²C controller used for the sensor.
pub const SENSOR_I2C_PORT: u8 = 0;
