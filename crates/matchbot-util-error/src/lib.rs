//! Single-line rendering of error chains for log fields.
//!
//! `tracing` fields are formatted with `Display`, which for most error types
//! only prints the outermost layer. [`FmtCompact`] walks `source()` and joins
//! every layer with `: `, so `err = %e.fmt_compact()` keeps the root cause in
//! the log line.

use std::{error, fmt, iter};

/// Displays an error followed by all of its sources.
pub struct CompactError<'e>(&'e (dyn error::Error + 'e));

impl fmt::Display for CompactError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = iter::successors(Some(self.0), |err| err.source());

        for (i, err) in chain.enumerate() {
            if i != 0 {
                f.write_str(": ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

pub trait FmtCompact<'e> {
    fn fmt_compact(self) -> CompactError<'e>;
}

impl<'e, E> FmtCompact<'e> for &'e E
where
    E: error::Error,
{
    fn fmt_compact(self) -> CompactError<'e> {
        CompactError(self)
    }
}

#[cfg(test)]
mod tests {
    use snafu::Snafu;

    use super::*;

    #[derive(Debug, Snafu)]
    enum TestError {
        #[snafu(display("disk full"))]
        DiskFull,
        #[snafu(display("could not save ledger"))]
        Save { source: Box<TestError> },
    }

    #[test]
    fn joins_whole_chain() {
        let err = TestError::Save {
            source: Box::new(TestError::DiskFull),
        };
        assert_eq!(
            err.fmt_compact().to_string(),
            "could not save ledger: disk full"
        );
    }

    #[test]
    fn single_error_has_no_separator() {
        assert_eq!(TestError::DiskFull.fmt_compact().to_string(), "disk full");
    }
}
