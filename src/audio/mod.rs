pub mod decode;
pub mod envelope;
pub mod features;
pub mod filter;
pub mod peaks;
pub mod tempo;
