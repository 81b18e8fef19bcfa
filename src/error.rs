/// Uniform error definition for the whole query pipeline.
#[derive(Debug)]
pub enum ExecErr {
    /// The `<address:port>` argument is empty or has no port segment at all.
    MalformedInvocation(String),
    /// The host is not an IPv4/IPv6/domain address, or the port is out of range.
    InvalidAddressPort(String),
    /// Domain lookup failed or returned nothing usable.
    ResolutionFailure { domain: String, cause: String },
    /// Unusable timeout option. Never fatal, see [crate::timeout::resolve_timeout].
    InvalidTimeout(String),
    /// Opening the session or one of the status calls failed.
    QueryFailure { target: String, cause: Box<ExecErr> },
    /// Configuration file could not be read or decoded.
    ConfigErr(String),
    /// Unintended errors occur when processing response packets.
    DataErr(String),
    /// Handling errors that occur during sockets.
    IoErr(std::io::Error),
}

impl ExecErr {
    /// Process exit code for this error.
    ///
    /// Every failure ends the process with status 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExecErr::MalformedInvocation(_)
            | ExecErr::InvalidAddressPort(_)
            | ExecErr::ResolutionFailure { .. }
            | ExecErr::InvalidTimeout(_)
            | ExecErr::QueryFailure { .. }
            | ExecErr::ConfigErr(_)
            | ExecErr::DataErr(_)
            | ExecErr::IoErr(_) => 1,
        }
    }
}

impl std::fmt::Display for ExecErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecErr::MalformedInvocation(str) => write!(f, "{}", str),
            ExecErr::InvalidAddressPort(str) => write!(f, "{}", str),
            ExecErr::ResolutionFailure { domain, cause } => write!(
                f,
                "Could not resolve domain {} on the dns server.\n{}",
                domain, cause
            ),
            ExecErr::InvalidTimeout(str) => write!(f, "{}", str),
            ExecErr::QueryFailure { target, cause } => write!(
                f,
                "Could not get query of minecraft at {}.\n{}",
                target, cause
            ),
            ExecErr::ConfigErr(str) => write!(f, "{}", str),
            ExecErr::DataErr(str) => write!(f, "{}", str),
            ExecErr::IoErr(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ExecErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecErr::QueryFailure { cause, .. } => Some(cause.as_ref()),
            ExecErr::IoErr(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExecErr {
    fn from(err: std::io::Error) -> Self {
        ExecErr::IoErr(err)
    }
}

impl From<serde_json::Error> for ExecErr {
    fn from(err: serde_json::Error) -> Self {
        ExecErr::ConfigErr(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ExecErr {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ExecErr::IoErr(std::io::Error::new(std::io::ErrorKind::TimedOut, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_failure_names_target_and_cause() {
        let err = ExecErr::QueryFailure {
            target: "192.168.1.10:25565".into(),
            cause: Box::new(ExecErr::DataErr("bad packet".into())),
        };

        assert_eq!(
            err.to_string(),
            "Could not get query of minecraft at 192.168.1.10:25565.\nbad packet"
        );
        assert_eq!(err.exit_code(), 1);
    }
}
