pub mod check;
pub mod config;
pub mod effects;
pub mod record;
pub mod tiers;
