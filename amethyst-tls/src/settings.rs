//! Typed view of the `tls` configuration subtree

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsSettingsError {
    #[error("malformed tls settings: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("TLS engine enabled without a certificate and key or a PFX file")]
    NoIdentity,

    #[error("certificate file given without a private key file")]
    MissingKey,

    #[error("private key file given without a certificate file")]
    MissingCertificate,
}

/// Settings collected by the `TLS*` directives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    pub usetls: bool,
    pub cert: Option<String>,
    pub privkey: Option<String>,
    pub passwd: Option<String>,
    pub pfx: Option<String>,
    /// Handshake timeout in seconds
    pub timeout: Option<u64>,
}

impl TlsSettings {
    pub fn from_value(value: &Value) -> Result<Self, TlsSettingsError> {
        Ok(Self::deserialize(value)?)
    }

    /// An enabled engine needs a certificate/key pair or a PFX file
    pub fn validate(&self) -> Result<(), TlsSettingsError> {
        match (&self.cert, &self.privkey) {
            (Some(_), None) => return Err(TlsSettingsError::MissingKey),
            (None, Some(_)) => return Err(TlsSettingsError::MissingCertificate),
            _ => {}
        }
        if self.usetls && self.cert.is_none() && self.pfx.is_none() {
            return Err(TlsSettingsError::NoIdentity);
        }
        Ok(())
    }
}
