use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default greetings seeded into an empty greetings table.
pub const DEFAULT_GREETINGS: [&str; 6] = [
    "Happy Holidays",
    "Season's Greetings",
    "Best Wishes",
    "Sincerely",
    "Warmest Regards",
    "From the desk of",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Greeting {
    pub id: i64,
    pub text: String,
}
