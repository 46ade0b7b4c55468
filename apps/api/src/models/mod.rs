pub mod card;
pub mod greeting;
pub mod usage;
