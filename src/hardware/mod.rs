//! 硬件外设
pub mod esc;
pub mod key;
pub mod led;
pub mod nrf24l01;
pub mod potentiometer;
