pub mod clip;
pub mod document;
pub mod draft;
pub mod platform;
pub mod schedule;
pub mod session_slot;

#[cfg(test)]
pub(crate) mod test_utils;
