//! TLS alert protocol: the two-byte record body.

use mote_types::{AlertDescription, AlertLevel, TlsError};

/// A TLS alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub fn warning(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Warning,
            description,
        }
    }

    pub fn fatal(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Fatal,
            description,
        }
    }

    /// Encode to the two-byte record body.
    pub fn encode(&self) -> [u8; 2] {
        [self.level as u8, self.description as u8]
    }

    /// Parse from the two record-body bytes. Unknown codes are a
    /// `decode_error`.
    pub fn parse(level: u8, description: u8) -> Result<Self, TlsError> {
        let level = AlertLevel::from_u8(level).map_err(|v| {
            TlsError::protocol(AlertDescription::DecodeError, format!("unknown alert level {v}"))
        })?;
        let description = AlertDescription::from_u8(description).map_err(|v| {
            TlsError::protocol(
                AlertDescription::DecodeError,
                format!("unknown alert description {v}"),
            )
        })?;
        Ok(Self { level, description })
    }
}
