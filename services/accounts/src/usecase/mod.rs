pub mod activation;
pub mod otp;
pub mod password_reset;
pub mod register;
pub mod sweep;
