use std::fmt;

use crate::event::EventCode;

/// One token on the gamepad channel: `"<code> <value>,"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlCommand {
    pub code: EventCode,
    pub value: i32,
}

impl ControlCommand {
    pub fn new(code: EventCode, value: i32) -> Self {
        Self { code, value }
    }

    /// Append the wire bytes of this command to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_string().as_bytes());
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {},", self.code, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_wire_token() {
        assert_eq!(ControlCommand::new(EventCode::AbsY, 2).to_string(), "ABS_Y 2,");
        assert_eq!(ControlCommand::new(EventCode::AbsRx, -4).to_string(), "ABS_RX -4,");

        let mut out = b"BTN_SOUTH 1,".to_vec();
        ControlCommand::new(EventCode::BtnSouth, 0).encode(&mut out);
        assert_eq!(out, b"BTN_SOUTH 1,BTN_SOUTH 0,");
    }
}
