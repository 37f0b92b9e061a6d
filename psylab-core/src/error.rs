use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("angle {0} is not a multiple of 30 between 0 and 180")]
    InvalidAngle(u16),
}
