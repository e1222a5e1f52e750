//! Позиционное кодирование полей фиксированного заголовка.

pub mod read;
pub mod write;

pub use read::FieldReader;
pub use write::FieldWriter;
