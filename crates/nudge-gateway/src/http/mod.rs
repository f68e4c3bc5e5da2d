pub mod drip;
pub mod health;
