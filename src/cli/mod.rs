pub mod cluster;
pub mod clusters;
pub mod import;
pub mod splash;
pub mod stats;
