use std::fmt;

/// Message response code carried in the third byte of a response frame.
///
/// The mapping from `u8` is total: codes the protocol does not define come
/// back as [`ResponseCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Ok,
    GeneralError,
    ChecksumFailure,
    Fragment,
    BadCommand,
    Unsupported,
    BadMessage,
    InvalidParameter,
    ExecutionFailed,
    BadDeviceId,
    RamBusy,
    BadPassword,
    PowerNoGood,
    PageIllegal,
    FlashFail,
    MainAppCorrupt,
    MessageTimeout,
    Unknown(u8),
}

impl ResponseCode {
    /// Raw wire value.
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::GeneralError => 0x01,
            Self::ChecksumFailure => 0x02,
            Self::Fragment => 0x03,
            Self::BadCommand => 0x04,
            Self::Unsupported => 0x05,
            Self::BadMessage => 0x06,
            Self::InvalidParameter => 0x07,
            Self::ExecutionFailed => 0x08,
            Self::BadDeviceId => 0x09,
            Self::RamBusy => 0x0A,
            Self::BadPassword => 0x0B,
            Self::PowerNoGood => 0x31,
            Self::PageIllegal => 0x32,
            Self::FlashFail => 0x33,
            Self::MainAppCorrupt => 0x34,
            Self::MessageTimeout => 0x35,
            Self::Unknown(code) => code,
        }
    }

    /// Whether the device accepted the command.
    pub fn is_success(self) -> bool {
        self == Self::Ok
    }

    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "Command Succeeded",
            Self::GeneralError => "Non-Specific/Unknown Error",
            Self::ChecksumFailure => "Received Checksum Failed",
            Self::Fragment => "Received Command Fragment",
            Self::BadCommand => "Unknown Command ID",
            Self::Unsupported => "Command is currently Unsupported",
            Self::BadMessage => "Bad Message Format",
            Self::InvalidParameter => "Parameter Value is invalid",
            Self::ExecutionFailed => "Failed to Execute Command",
            Self::BadDeviceId => "Unknown Device ID",
            Self::RamBusy => "RAM Access Failed -- Ram Busy",
            Self::BadPassword => "Password is Incorrect",
            Self::PowerNoGood => "Voltage Too Low for Re-Flash Operation.",
            Self::PageIllegal => "Illegal Page Number",
            Self::FlashFail => "Page did not Reprogram Correctly",
            Self::MainAppCorrupt => "Main Application is Corrupt",
            Self::MessageTimeout => "Messaging State Machine Timed Out",
            Self::Unknown(_) => "Unrecognized Response Code",
        }
    }
}

impl From<u8> for ResponseCode {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::GeneralError,
            0x02 => Self::ChecksumFailure,
            0x03 => Self::Fragment,
            0x04 => Self::BadCommand,
            0x05 => Self::Unsupported,
            0x06 => Self::BadMessage,
            0x07 => Self::InvalidParameter,
            0x08 => Self::ExecutionFailed,
            0x09 => Self::BadDeviceId,
            0x0A => Self::RamBusy,
            0x0B => Self::BadPassword,
            0x31 => Self::PowerNoGood,
            0x32 => Self::PageIllegal,
            0x33 => Self::FlashFail,
            0x34 => Self::MainAppCorrupt,
            0x35 => Self::MessageTimeout,
            other => Self::Unknown(other),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(code: ResponseCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "{} (0x{code:02X})", self.description()),
            _ => f.write_str(self.description()),
        }
    }
}

/// Description for a raw response code.
pub fn response_code_description(code: u8) -> &'static str {
    ResponseCode::from(code).description()
}
