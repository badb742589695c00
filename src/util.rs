pub mod atomic;
pub mod hashing;
pub mod size;
