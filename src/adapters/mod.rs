pub mod checkout;
pub mod email;
pub mod kyc;
pub mod webhook;
