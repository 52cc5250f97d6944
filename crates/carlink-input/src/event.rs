use std::fmt;

/// Linux input event types used by gamepads.
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;

/// Controller event codes, named as the gamepad server expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCode {
    AbsX,
    AbsY,
    AbsZ,
    AbsRx,
    AbsRy,
    AbsRz,
    AbsHat0X,
    AbsHat0Y,
    BtnSouth,
    BtnEast,
    BtnNorth,
    BtnWest,
    BtnTl,
    BtnTr,
    BtnSelect,
    BtnStart,
    BtnMode,
    BtnThumbL,
    BtnThumbR,
    Unknown { kind: u16, code: u16 },
}

/// Codes the encoder forwards; everything else is ignored.
pub const ALLOWED_CODES: [EventCode; 7] = [
    EventCode::AbsY,
    EventCode::AbsRx,
    EventCode::BtnNorth,
    EventCode::BtnWest,
    EventCode::BtnSouth,
    EventCode::BtnEast,
    EventCode::BtnTr,
];

const NAMED: [(EventCode, &str, u16, u16); 19] = [
    (EventCode::AbsX, "ABS_X", EV_ABS, 0x00),
    (EventCode::AbsY, "ABS_Y", EV_ABS, 0x01),
    (EventCode::AbsZ, "ABS_Z", EV_ABS, 0x02),
    (EventCode::AbsRx, "ABS_RX", EV_ABS, 0x03),
    (EventCode::AbsRy, "ABS_RY", EV_ABS, 0x04),
    (EventCode::AbsRz, "ABS_RZ", EV_ABS, 0x05),
    (EventCode::AbsHat0X, "ABS_HAT0X", EV_ABS, 0x10),
    (EventCode::AbsHat0Y, "ABS_HAT0Y", EV_ABS, 0x11),
    (EventCode::BtnSouth, "BTN_SOUTH", EV_KEY, 0x130),
    (EventCode::BtnEast, "BTN_EAST", EV_KEY, 0x131),
    (EventCode::BtnNorth, "BTN_NORTH", EV_KEY, 0x133),
    (EventCode::BtnWest, "BTN_WEST", EV_KEY, 0x134),
    (EventCode::BtnTl, "BTN_TL", EV_KEY, 0x136),
    (EventCode::BtnTr, "BTN_TR", EV_KEY, 0x137),
    (EventCode::BtnSelect, "BTN_SELECT", EV_KEY, 0x13a),
    (EventCode::BtnStart, "BTN_START", EV_KEY, 0x13b),
    (EventCode::BtnMode, "BTN_MODE", EV_KEY, 0x13c),
    (EventCode::BtnThumbL, "BTN_THUMBL", EV_KEY, 0x13d),
    (EventCode::BtnThumbR, "BTN_THUMBR", EV_KEY, 0x13e),
];

impl EventCode {
    /// Wire name, e.g. `"ABS_Y"`.
    pub fn name(self) -> &'static str {
        NAMED
            .iter()
            .find(|(code, ..)| *code == self)
            .map(|(_, name, ..)| *name)
            .unwrap_or("UNKNOWN")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        NAMED
            .iter()
            .find(|(_, n, ..)| *n == name)
            .map(|(code, ..)| *code)
    }

    /// Map a raw Linux `(type, code)` pair.
    pub fn from_evdev(kind: u16, code: u16) -> Self {
        NAMED
            .iter()
            .find(|(_, _, k, c)| *k == kind && *c == code)
            .map(|(event, ..)| *event)
            .unwrap_or(EventCode::Unknown { kind, code })
    }

    pub fn is_axis(self) -> bool {
        match self {
            EventCode::Unknown { kind, .. } => kind == EV_ABS,
            other => other.name().starts_with("ABS_"),
        }
    }

    pub fn is_allowed(self) -> bool {
        ALLOWED_CODES.contains(&self)
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCode::Unknown { kind, code } => write!(f, "UNKNOWN_{kind:#x}_{code:#x}"),
            known => f.write_str(known.name()),
        }
    }
}

/// One raw controller reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSample {
    pub code: EventCode,
    pub value: i32,
}

impl ControllerSample {
    pub fn new(code: EventCode, value: i32) -> Self {
        Self { code, value }
    }
}
