pub mod deploy;
pub mod params;
