//! Запись IQ dwell за dwell с понижением усиления при насыщении.
//!
//! Сессия: настройка устройства, затем цикл dwell (приём → проверка
//! насыщения → файл `.iq` с [`iqdwell_types::PacketHeader`]) до истечения
//! времени сбора, затем выключение приёма.

pub mod config;
pub mod device;
pub mod error;
pub mod gain;
pub mod metrics;
pub mod pipeline;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use config::*;
pub use device::*;
pub use error::*;
pub use gain::*;
pub use metrics::*;
pub use pipeline::*;
