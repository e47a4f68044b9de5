//! fred error mapping to CacheError.

use fred::error::{Error, ErrorKind};

use shipledger_core::cache::CacheError;

/// Maps fred errors to CacheError.
///
/// Transport, timeout and authentication failures become
/// `ConnectionFailed`; everything else is an `OperationFailed`.
pub fn map_fred_error(err: Error) -> CacheError {
    match err.kind() {
        ErrorKind::IO | ErrorKind::Timeout | ErrorKind::Canceled | ErrorKind::Auth => {
            CacheError::ConnectionFailed(err.to_string())
        }
        _ => CacheError::OperationFailed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_map_to_connection_failed() {
        for kind in [ErrorKind::IO, ErrorKind::Timeout, ErrorKind::Auth] {
            let err = Error::new(kind, "boom");
            assert!(matches!(
                map_fred_error(err),
                CacheError::ConnectionFailed(_)
            ));
        }
    }

    #[test]
    fn test_command_errors_map_to_operation_failed() {
        let err = Error::new(ErrorKind::InvalidArgument, "wrong type");
        assert!(matches!(
            map_fred_error(err),
            CacheError::OperationFailed(_)
        ));
    }
}
