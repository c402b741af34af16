pub mod signature;
pub mod test_utils;
pub mod validation;
