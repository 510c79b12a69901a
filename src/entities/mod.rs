// 🎮 Entity Models
// Roster entities shared by the store, the importer and the API

pub mod player;

pub use player::{PaymentMethods, PlayerRecord};
