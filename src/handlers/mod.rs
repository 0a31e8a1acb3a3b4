pub mod health;
pub mod sites;
