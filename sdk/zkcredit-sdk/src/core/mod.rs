pub mod constants;
pub mod gateway;
pub mod provider;
pub mod signer;
