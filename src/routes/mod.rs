pub mod dashboard;
pub mod health;
pub mod parks;
pub mod refresher;
