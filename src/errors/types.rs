//! Custom error types for hubtest

use std::fmt;

/// Main error type for harness operations
#[derive(Debug)]
pub enum HarnessError {
    /// No hub controller is attached
    HubNotFound,
    /// More than one hub controller is attached and no serial was given
    HubAmbiguous(Vec<String>),
    /// No attached hub controller carries the requested serial number
    HubSerialMismatch(String),
    /// Port selector or port set could not be interpreted
    InvalidPortArgument(String),
    /// A hub control channel or serial console could not be opened
    ChannelOpenFailure { path: String, reason: String },
    /// The board on the powered port is not the board the map expects
    SerialMismatch { expected: String },
    /// External build/flash tool failed
    FlashFailure { target: String, message: String },
    /// Serial monitor gave up waiting for the marker
    MonitorTimeout { seconds: u64 },
    /// Serial monitor lost its transport
    MonitorTransportError(String),
    /// Low-level USB errors
    Usb(rusb::Error),
    /// Device enumeration errors
    Enumeration(String),
    /// Configuration related errors
    Config(String),
    /// General I/O errors
    Io(std::io::Error),
    /// Serialization errors
    Serialization(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::HubNotFound => write!(
                f,
                "No hub controller found, attach a hub controller and check its USB connection."
            ),
            HarnessError::HubAmbiguous(serials) => write!(
                f,
                "Found multiple hub controllers ({}), provide a matching serial number or detach unwanted hubs.",
                serials.join(", ")
            ),
            HarnessError::HubSerialMismatch(serial) => write!(
                f,
                "No hub controller with serial number {} found, check the serial number or list attached hubs.",
                serial
            ),
            HarnessError::InvalidPortArgument(msg) => write!(f, "Invalid port argument: {}", msg),
            HarnessError::ChannelOpenFailure { path, reason } => write!(
                f,
                "Failed to open channel {}: {}",
                path, reason
            ),
            HarnessError::SerialMismatch { expected } => write!(
                f,
                "No serial device with serial number {} is attached, the board differs from the port map.",
                expected
            ),
            HarnessError::FlashFailure { target, message } => {
                write!(f, "Build or load of target {} failed: {}", target, message)
            }
            HarnessError::MonitorTimeout { seconds } => write!(
                f,
                "Watchdog marker not observed within {} seconds.",
                seconds
            ),
            HarnessError::MonitorTransportError(msg) => {
                write!(f, "Reading from serial console failed: {}", msg)
            }
            HarnessError::Usb(err) => write!(f, "USB error: {}", err),
            HarnessError::Enumeration(msg) => write!(f, "Device enumeration error: {}", msg),
            HarnessError::Config(msg) => write!(f, "Configuration error: {}", msg),
            HarnessError::Io(err) => write!(f, "I/O error: {}", err),
            HarnessError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Io(err) => Some(err),
            HarnessError::Usb(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err)
    }
}

impl From<rusb::Error> for HarnessError {
    fn from(err: rusb::Error) -> Self {
        HarnessError::Usb(err)
    }
}

impl From<serialport::Error> for HarnessError {
    fn from(err: serialport::Error) -> Self {
        HarnessError::Enumeration(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for HarnessError {
    fn from(err: toml::de::Error) -> Self {
        HarnessError::Config(err.to_string())
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_resolution_messages_name_corrective_action() {
        let ambiguous = HarnessError::HubAmbiguous(vec!["1".to_string(), "2".to_string()]);
        let message = ambiguous.to_string();
        assert!(message.contains("provide a matching serial number"));
        assert!(message.contains("detach unwanted hubs"));
        assert!(message.contains("1, 2"));

        let not_found = HarnessError::HubNotFound.to_string();
        assert!(not_found.contains("attach a hub controller"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error;

        let err = HarnessError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("I/O error"));
    }
}
