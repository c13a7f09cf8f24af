use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A content or column query reached a hidden line projection.
    #[snafu(display("{operation} is not supported on a hidden line"))]
    Unsupported { operation: &'static str },

    #[snafu(display("index {index} is out of range for length {len}"))]
    OutOfRange { index: usize, len: usize },
}
