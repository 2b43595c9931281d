pub mod activation;
pub mod health;
pub mod password_reset;
pub mod register;
