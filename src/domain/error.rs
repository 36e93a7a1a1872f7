//! Domain error types.

/// Top-level error type for lftrader.
#[derive(Debug, thiserror::Error)]
pub enum LftError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to decode bars for {symbol}: {reason}")]
    Decode { symbol: String, reason: String },

    #[error("failed to encode report: {reason}")]
    Encode { reason: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("order rejected for {symbol}: {reason}")]
    OrderRejected { symbol: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&LftError> for std::process::ExitCode {
    fn from(err: &LftError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}

impl LftError {
    pub fn exit_code(&self) -> u8 {
        match self {
            LftError::Io(_) | LftError::Encode { .. } => 1,
            LftError::ConfigParse { .. }
            | LftError::ConfigMissing { .. }
            | LftError::ConfigInvalid { .. } => 2,
            LftError::Decode { .. } => 3,
            LftError::UnknownStrategy { .. } | LftError::OrderRejected { .. } => 4,
            LftError::NoData { .. } | LftError::InsufficientData { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_family() {
        let io = LftError::Io(std::io::Error::other("disk"));
        assert_eq!(io.exit_code(), 1);
        let cfg = LftError::ConfigMissing {
            section: "data".into(),
            key: "bars_dir".into(),
        };
        assert_eq!(cfg.exit_code(), 2);
        let decode = LftError::Decode {
            symbol: "AAPL".into(),
            reason: "bad row".into(),
        };
        assert_eq!(decode.exit_code(), 3);
        let strat = LftError::UnknownStrategy {
            name: "magic".into(),
        };
        assert_eq!(strat.exit_code(), 4);
        let none = LftError::NoData {
            symbol: "AAPL".into(),
        };
        assert_eq!(none.exit_code(), 5);
    }

    #[test]
    fn messages_name_the_subject() {
        let err = LftError::InsufficientData {
            symbol: "MSFT".into(),
            bars: 10,
            minimum: 22,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for MSFT: have 10 bars, need 22"
        );
    }
}
