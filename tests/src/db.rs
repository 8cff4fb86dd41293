
#[cfg(feature = "postgresql")]
pub mod postgresql;
