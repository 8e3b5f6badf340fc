pub mod doctor;
pub mod enums;
pub mod feedback;
pub mod medicine;
pub mod page;
pub mod patient;
pub mod payment;
pub mod registration;
pub mod statistics;
pub mod user;
pub mod validation;

pub use doctor::*;
pub use enums::*;
pub use feedback::*;
pub use medicine::*;
pub use page::*;
pub use patient::*;
pub use payment::*;
pub use registration::*;
pub use statistics::*;
pub use user::*;
pub use validation::FieldErrors;
