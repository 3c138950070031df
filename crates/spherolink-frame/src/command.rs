//! Device and command identifiers.
//!
//! A command is addressed by a `(device_id, command_id)` pair. The core
//! device handles connection housekeeping; the sphero device drives the robot.

/// Core device (ping, version, power, bootloader).
pub const DID_CORE: u8 = 0x00;

/// Robot device (motion, LEDs, sensors, macros).
pub const DID_SPHERO: u8 = 0x02;

/// Command ids understood by [`DID_CORE`].
pub mod core_cmd {
    pub const PING: u8 = 0x01;
    pub const VERSION: u8 = 0x02;
    pub const SET_BT_NAME: u8 = 0x10;
    pub const GET_BT_NAME: u8 = 0x11;
    pub const SET_AUTO_RECONNECT: u8 = 0x12;
    pub const GET_AUTO_RECONNECT: u8 = 0x13;
    pub const GET_POWER_STATE: u8 = 0x20;
    pub const SET_POWER_NOTIFY: u8 = 0x21;
    pub const SLEEP: u8 = 0x22;
    pub const SET_INACTIVE_TIMER: u8 = 0x25;
    pub const GOTO_BOOTLOADER: u8 = 0x30;
    pub const RUN_L1_DIAGS: u8 = 0x40;
    pub const RUN_L2_DIAGS: u8 = 0x41;
}

/// Command ids understood by [`DID_SPHERO`].
pub mod sphero_cmd {
    pub const SET_CALIBRATION: u8 = 0x01;
    pub const SET_STABILIZATION: u8 = 0x02;
    pub const SET_ROTATION_RATE: u8 = 0x03;
    pub const REENABLE_DEMO: u8 = 0x06;
    pub const SELF_LEVEL: u8 = 0x09;
    pub const SET_DATA_STREAMING: u8 = 0x11;
    pub const SET_COLLISION_DETECTION: u8 = 0x12;
    pub const LOCATOR: u8 = 0x13;
    pub const SET_ACCELEROMETER: u8 = 0x14;
    pub const READ_LOCATOR: u8 = 0x15;
    pub const SET_RGB_LED: u8 = 0x20;
    pub const SET_BACK_LED: u8 = 0x21;
    pub const GET_RGB_LED: u8 = 0x22;
    pub const ROLL: u8 = 0x30;
    pub const BOOST: u8 = 0x31;
    pub const MOVE: u8 = 0x32;
    pub const SET_RAW_MOTORS: u8 = 0x33;
    pub const SET_MOTION_TIMEOUT: u8 = 0x34;
    pub const SET_OPTIONS_FLAG: u8 = 0x35;
    pub const GET_OPTIONS_FLAG: u8 = 0x36;
    pub const SET_TEMP_OPTIONS_FLAG: u8 = 0x37;
    pub const GET_TEMP_OPTIONS_FLAG: u8 = 0x38;
    pub const RUN_MACRO: u8 = 0x50;
    pub const SAVE_TEMP_MACRO: u8 = 0x51;
    pub const SAVE_MACRO: u8 = 0x52;
    pub const INIT_MACRO_EXECUTIVE: u8 = 0x54;
    pub const ABORT_MACRO: u8 = 0x55;
    pub const MACRO_STATUS: u8 = 0x56;
    pub const SET_MACRO_PARAM: u8 = 0x57;
    pub const APPEND_TEMP_MACRO_CHUNK: u8 = 0x58;
    pub const ERASE_ORBBASIC: u8 = 0x60;
    pub const APPEND_FRAGMENT: u8 = 0x61;
    pub const EXEC_ORBBASIC: u8 = 0x62;
    pub const ABORT_ORBBASIC: u8 = 0x63;
    pub const ANSWER_INPUT: u8 = 0x64;
}

/// One named command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub device_id: u8,
    pub command_id: u8,
}

const fn entry(name: &'static str, device_id: u8, command_id: u8) -> CatalogEntry {
    CatalogEntry {
        name,
        device_id,
        command_id,
    }
}

/// Every known command, core device first.
pub const CATALOG: &[CatalogEntry] = &[
    entry("ping", DID_CORE, core_cmd::PING),
    entry("version", DID_CORE, core_cmd::VERSION),
    entry("set-bt-name", DID_CORE, core_cmd::SET_BT_NAME),
    entry("get-bt-name", DID_CORE, core_cmd::GET_BT_NAME),
    entry("set-auto-reconnect", DID_CORE, core_cmd::SET_AUTO_RECONNECT),
    entry("get-auto-reconnect", DID_CORE, core_cmd::GET_AUTO_RECONNECT),
    entry("get-power-state", DID_CORE, core_cmd::GET_POWER_STATE),
    entry("set-power-notify", DID_CORE, core_cmd::SET_POWER_NOTIFY),
    entry("sleep", DID_CORE, core_cmd::SLEEP),
    entry("set-inactive-timer", DID_CORE, core_cmd::SET_INACTIVE_TIMER),
    entry("goto-bootloader", DID_CORE, core_cmd::GOTO_BOOTLOADER),
    entry("run-l1-diags", DID_CORE, core_cmd::RUN_L1_DIAGS),
    entry("run-l2-diags", DID_CORE, core_cmd::RUN_L2_DIAGS),
    entry("set-calibration", DID_SPHERO, sphero_cmd::SET_CALIBRATION),
    entry("set-stabilization", DID_SPHERO, sphero_cmd::SET_STABILIZATION),
    entry("set-rotation-rate", DID_SPHERO, sphero_cmd::SET_ROTATION_RATE),
    entry("reenable-demo", DID_SPHERO, sphero_cmd::REENABLE_DEMO),
    entry("self-level", DID_SPHERO, sphero_cmd::SELF_LEVEL),
    entry("set-data-streaming", DID_SPHERO, sphero_cmd::SET_DATA_STREAMING),
    entry("set-collision-detection", DID_SPHERO, sphero_cmd::SET_COLLISION_DETECTION),
    entry("locator", DID_SPHERO, sphero_cmd::LOCATOR),
    entry("set-accelerometer", DID_SPHERO, sphero_cmd::SET_ACCELEROMETER),
    entry("read-locator", DID_SPHERO, sphero_cmd::READ_LOCATOR),
    entry("set-rgb-led", DID_SPHERO, sphero_cmd::SET_RGB_LED),
    entry("set-back-led", DID_SPHERO, sphero_cmd::SET_BACK_LED),
    entry("get-rgb-led", DID_SPHERO, sphero_cmd::GET_RGB_LED),
    entry("roll", DID_SPHERO, sphero_cmd::ROLL),
    entry("boost", DID_SPHERO, sphero_cmd::BOOST),
    entry("move", DID_SPHERO, sphero_cmd::MOVE),
    entry("set-raw-motors", DID_SPHERO, sphero_cmd::SET_RAW_MOTORS),
    entry("set-motion-timeout", DID_SPHERO, sphero_cmd::SET_MOTION_TIMEOUT),
    entry("set-options-flag", DID_SPHERO, sphero_cmd::SET_OPTIONS_FLAG),
    entry("get-options-flag", DID_SPHERO, sphero_cmd::GET_OPTIONS_FLAG),
    entry("set-temp-options-flag", DID_SPHERO, sphero_cmd::SET_TEMP_OPTIONS_FLAG),
    entry("get-temp-options-flag", DID_SPHERO, sphero_cmd::GET_TEMP_OPTIONS_FLAG),
    entry("run-macro", DID_SPHERO, sphero_cmd::RUN_MACRO),
    entry("save-temp-macro", DID_SPHERO, sphero_cmd::SAVE_TEMP_MACRO),
    entry("save-macro", DID_SPHERO, sphero_cmd::SAVE_MACRO),
    entry("init-macro-executive", DID_SPHERO, sphero_cmd::INIT_MACRO_EXECUTIVE),
    entry("abort-macro", DID_SPHERO, sphero_cmd::ABORT_MACRO),
    entry("macro-status", DID_SPHERO, sphero_cmd::MACRO_STATUS),
    entry("set-macro-param", DID_SPHERO, sphero_cmd::SET_MACRO_PARAM),
    entry("append-temp-macro-chunk", DID_SPHERO, sphero_cmd::APPEND_TEMP_MACRO_CHUNK),
    entry("erase-orbbasic", DID_SPHERO, sphero_cmd::ERASE_ORBBASIC),
    entry("append-fragment", DID_SPHERO, sphero_cmd::APPEND_FRAGMENT),
    entry("exec-orbbasic", DID_SPHERO, sphero_cmd::EXEC_ORBBASIC),
    entry("abort-orbbasic", DID_SPHERO, sphero_cmd::ABORT_ORBBASIC),
    entry("answer-input", DID_SPHERO, sphero_cmd::ANSWER_INPUT),
];

/// Look a command up by its catalog name (case-insensitive, `_` accepted for `-`).
pub fn lookup_command(name: &str) -> Option<CatalogEntry> {
    let wanted = name.trim().to_ascii_lowercase().replace('_', "-");
    CATALOG.iter().copied().find(|e| e.name == wanted)
}

/// Catalog name for a `(device_id, command_id)` pair.
pub fn command_name(device_id: u8, command_id: u8) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|e| e.device_id == device_id && e.command_id == command_id)
        .map(|e| e.name)
}

/// Returns a human-readable name for a device ID.
pub fn device_name(device_id: u8) -> &'static str {
    match device_id {
        DID_CORE => "CORE",
        DID_SPHERO => "SPHERO",
        _ => "UNKNOWN",
    }
}
