pub mod crop;
pub mod info;
