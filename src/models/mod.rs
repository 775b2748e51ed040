pub mod appointment;
pub mod enums;
pub mod psychologist;

pub use appointment::*;
pub use enums::*;
pub use psychologist::*;
