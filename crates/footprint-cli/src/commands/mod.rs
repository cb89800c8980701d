pub mod allocate;
pub mod crs;
