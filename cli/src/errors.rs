use distimage::{BuildError, Error};
use std::io;

#[derive(Debug, Fail)]
pub(crate) enum DistimageError {
    #[fail(display = "unable to load build description: {}", why)]
    Description { why: io::Error },
    #[fail(display = "invalid build setup: {}", why)]
    Setup { why: BuildError },
    #[fail(display = "{}", why)]
    Build { why: Error },
    #[fail(display = "{}", why)]
    ResultDump { why: io::Error },
}

impl From<Error> for DistimageError {
    fn from(why: Error) -> DistimageError { DistimageError::Build { why } }
}

impl From<BuildError> for DistimageError {
    fn from(why: BuildError) -> DistimageError { DistimageError::Setup { why } }
}
