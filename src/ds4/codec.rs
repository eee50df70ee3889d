//! DualShock 4 report codec
//!
//! Pure conversions between raw HID report bytes and the structured types in
//! [`crate::ds4::types`]. Every byte offset lives in [`crate::ds4::constants`];
//! nothing here performs I/O or keeps state.

use crate::ds4::constants::*;
use crate::ds4::error::DecodeError;
use crate::ds4::types::{BatteryStatus, Buttons, ControllerState, DPad, OutputCommand, Rgb, Stick};

/// Raw output report bytes
pub type OutputReportBytes = [u8; OUTPUT_REPORT_SIZE];

/// Decode one input report into a fresh snapshot
pub fn decode(data: &[u8]) -> Result<ControllerState, DecodeError> {
    if data.len() < MIN_INPUT_REPORT_LEN {
        return Err(DecodeError::ShortReport {
            len: data.len(),
            required: MIN_INPUT_REPORT_LEN,
        });
    }

    let dpad = DPad::from_nibble(data[DPAD_FACE_OFFSET] & 0x0F);
    let face = data[DPAD_FACE_OFFSET] >> 4;
    let shoulders = data[SHOULDER_OFFSET];
    let system = data[SYSTEM_OFFSET];

    let buttons = Buttons {
        square: face & FACE_SQUARE != 0,
        cross: face & FACE_CROSS != 0,
        circle: face & FACE_CIRCLE != 0,
        triangle: face & FACE_TRIANGLE != 0,

        l1: shoulders & BTN_L1 != 0,
        r1: shoulders & BTN_R1 != 0,
        l2: shoulders & BTN_L2 != 0,
        r2: shoulders & BTN_R2 != 0,

        share: shoulders & BTN_SHARE != 0,
        options: shoulders & BTN_OPTIONS != 0,
        ps: system & BTN_PS != 0,
        touchpad: system & BTN_TOUCHPAD != 0,

        l3: shoulders & BTN_L3 != 0,
        r3: shoulders & BTN_R3 != 0,

        dpad_up: dpad.up(),
        dpad_down: dpad.down(),
        dpad_left: dpad.left(),
        dpad_right: dpad.right(),
    };

    Ok(ControllerState {
        buttons,
        dpad,
        left_stick: Stick {
            x: axis(data[LEFT_STICK_X_OFFSET]),
            y: axis(data[LEFT_STICK_Y_OFFSET]),
        },
        right_stick: Stick {
            x: axis(data[RIGHT_STICK_X_OFFSET]),
            y: axis(data[RIGHT_STICK_Y_OFFSET]),
        },
        battery: Some(decode_battery(data[BATTERY_OFFSET])),
    })
}

/// Split the status byte into a coarse percentage and the charging bit
pub fn decode_battery(status: u8) -> BatteryStatus {
    let level = status & BATTERY_LEVEL_MASK;
    BatteryStatus {
        percent: (level * 10).min(100),
        charging: status & BATTERY_CHARGING_MASK != 0,
    }
}

/// Re-center an unsigned axis byte around zero
fn axis(raw: u8) -> i8 {
    // 0..=255 minus 128 always fits in i8
    (raw as i16 - STICK_CENTER) as i8
}

/// Full contents of one output report
///
/// Motors and light bar share a single report, so anything not set here is
/// written as zero. Compose one value when both should change together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputReport {
    pub left_motor: u8,
    pub right_motor: u8,

    /// `None` leaves the LED bytes and brightness at zero
    pub color: Option<Rgb>,
}

impl OutputReport {
    pub fn motors(left: u8, right: u8) -> Self {
        Self {
            left_motor: left,
            right_motor: right,
            color: None,
        }
    }

    pub fn color(color: Rgb) -> Self {
        Self {
            color: Some(color),
            ..Self::default()
        }
    }

    pub fn encode(&self) -> OutputReportBytes {
        let mut report = [0u8; OUTPUT_REPORT_SIZE];
        report[OUT_REPORT_ID_INDEX] = OUTPUT_REPORT_ID;
        report[OUT_FLAGS_INDEX] = OUTPUT_ENABLE_FLAGS;
        report[OUT_LEFT_MOTOR_INDEX] = self.left_motor;
        report[OUT_RIGHT_MOTOR_INDEX] = self.right_motor;

        if let Some(color) = self.color {
            report[OUT_LED_RED_INDEX] = color.red;
            report[OUT_LED_GREEN_INDEX] = color.green;
            report[OUT_LED_BLUE_INDEX] = color.blue;
            report[OUT_LED_BRIGHTNESS_INDEX] = LED_FULL_BRIGHTNESS;
        }

        report
    }
}

impl From<OutputCommand> for OutputReport {
    fn from(command: OutputCommand) -> Self {
        match command {
            OutputCommand::SetMotors { left, right } => OutputReport::motors(left, right),
            OutputCommand::SetColor(color) => OutputReport::color(color),
            OutputCommand::SetAll { left, right, color } => OutputReport {
                left_motor: left,
                right_motor: right,
                color: Some(color),
            },
        }
    }
}

/// Encode a command into report bytes
pub fn encode(command: OutputCommand) -> OutputReportBytes {
    OutputReport::from(command).encode()
}

/// Motor-only report; out-of-range values are clamped
pub fn encode_motors(left: i32, right: i32) -> OutputReportBytes {
    encode(OutputCommand::set_motors(left, right))
}

/// Color-only report; out-of-range values are clamped
pub fn encode_color(red: i32, green: i32, blue: i32) -> OutputReportBytes {
    encode(OutputCommand::set_color(red, green, blue))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral_report() -> [u8; INPUT_REPORT_SIZE] {
        let mut data = [0u8; INPUT_REPORT_SIZE];
        data[0] = 0x01;
        data[LEFT_STICK_X_OFFSET..=RIGHT_STICK_Y_OFFSET].fill(0x80);
        data[DPAD_FACE_OFFSET] = DPAD_NEUTRAL;
        data
    }

    fn lit(dpad: DPad) -> [bool; 4] {
        [dpad.up(), dpad.right(), dpad.down(), dpad.left()]
    }

    #[test]
    fn test_neutral_report() {
        let state = decode(&neutral_report()).unwrap();
        assert_eq!(state.buttons, Buttons::default());
        assert_eq!(state.dpad, DPad::Neutral);
        assert_eq!(state.left_stick, Stick { x: 0, y: 0 });
        assert_eq!(state.right_stick, Stick { x: 0, y: 0 });
        assert_eq!(
            state.battery,
            Some(BatteryStatus {
                percent: 0,
                charging: false
            })
        );
    }

    #[test]
    fn test_stick_recentering() {
        let mut data = neutral_report();
        data[LEFT_STICK_X_OFFSET] = 0x00;
        data[LEFT_STICK_Y_OFFSET] = 0xFF;
        data[RIGHT_STICK_X_OFFSET] = 0x7F;
        data[RIGHT_STICK_Y_OFFSET] = 0x81;

        let state = decode(&data).unwrap();
        assert_eq!(state.left_stick, Stick { x: -128, y: 127 });
        assert_eq!(state.right_stick, Stick { x: -1, y: 1 });
    }

    #[test]
    fn test_dpad_adjacency_table() {
        // [up, right, down, left]
        let expected = [
            [true, false, false, false],
            [true, true, false, false],
            [false, true, false, false],
            [false, true, true, false],
            [false, false, true, false],
            [false, false, true, true],
            [false, false, false, true],
            [true, false, false, true],
            [false, false, false, false],
        ];

        for (nibble, want) in expected.iter().enumerate() {
            let mut data = neutral_report();
            data[DPAD_FACE_OFFSET] = nibble as u8;
            let state = decode(&data).unwrap();
            assert_eq!(lit(state.dpad), *want, "nibble {}", nibble);
            assert_eq!(
                [
                    state.buttons.dpad_up,
                    state.buttons.dpad_right,
                    state.buttons.dpad_down,
                    state.buttons.dpad_left
                ],
                *want,
                "button flags for nibble {}",
                nibble
            );
        }
    }

    #[test]
    fn test_every_direction_lights_one_or_two_neighbours() {
        for nibble in 0..8u8 {
            let count = lit(DPad::from_nibble(nibble)).iter().filter(|&&on| on).count();
            assert!(count == 1 || count == 2, "nibble {} lit {}", nibble, count);
        }
    }

    #[test]
    fn test_face_buttons_do_not_disturb_dpad() {
        let mut data = neutral_report();
        data[DPAD_FACE_OFFSET] = 0x20 | 0x02; // cross + right

        let state = decode(&data).unwrap();
        assert!(state.buttons.cross);
        assert!(!state.buttons.square && !state.buttons.circle && !state.buttons.triangle);
        assert_eq!(state.dpad, DPad::Right);
    }

    #[test]
    fn test_face_button_bits() {
        let mut data = neutral_report();
        data[DPAD_FACE_OFFSET] = 0xF0 | DPAD_NEUTRAL;
        let state = decode(&data).unwrap();
        assert!(state.buttons.square && state.buttons.cross);
        assert!(state.buttons.circle && state.buttons.triangle);

        data[DPAD_FACE_OFFSET] = 0x80 | DPAD_NEUTRAL;
        let state = decode(&data).unwrap();
        assert!(state.buttons.triangle);
        assert!(!state.buttons.square);
    }

    #[test]
    fn test_shoulder_and_system_bits() {
        let cases: [(u8, fn(&Buttons) -> bool); 8] = [
            (BTN_L1, |b| b.l1),
            (BTN_R1, |b| b.r1),
            (BTN_L2, |b| b.l2),
            (BTN_R2, |b| b.r2),
            (BTN_SHARE, |b| b.share),
            (BTN_OPTIONS, |b| b.options),
            (BTN_L3, |b| b.l3),
            (BTN_R3, |b| b.r3),
        ];

        for (mask, get) in cases {
            let mut data = neutral_report();
            data[SHOULDER_OFFSET] = mask;
            let buttons = decode(&data).unwrap().buttons;
            assert!(get(&buttons), "mask 0x{:02x}", mask);
            assert!(!buttons.ps && !buttons.touchpad);
        }

        let mut data = neutral_report();
        data[SYSTEM_OFFSET] = BTN_PS | BTN_TOUCHPAD | 0xFC;
        let buttons = decode(&data).unwrap().buttons;
        assert!(buttons.ps && buttons.touchpad);
        assert!(!buttons.l1 && !buttons.r3);
    }

    #[test]
    fn test_battery_status_byte() {
        assert_eq!(
            decode_battery(0x15),
            BatteryStatus {
                percent: 50,
                charging: true
            }
        );
        assert_eq!(
            decode_battery(0x09),
            BatteryStatus {
                percent: 90,
                charging: false
            }
        );
        // Wired controllers report up to 11
        assert_eq!(decode_battery(0x1B).percent, 100);
    }

    #[test]
    fn test_battery_from_report() {
        let mut data = neutral_report();
        data[BATTERY_OFFSET] = 0x15;
        let battery = decode(&data).unwrap().battery.unwrap();
        assert_eq!((battery.percent, battery.charging), (50, true));
    }

    #[test]
    fn test_short_report() {
        let data = neutral_report();
        assert_eq!(
            decode(&data[..MIN_INPUT_REPORT_LEN - 1]),
            Err(DecodeError::ShortReport {
                len: MIN_INPUT_REPORT_LEN - 1,
                required: MIN_INPUT_REPORT_LEN
            })
        );
        assert!(decode(&[]).is_err());
        assert!(decode(&data[..MIN_INPUT_REPORT_LEN]).is_ok());
    }

    #[test]
    fn test_encode_motors_layout() {
        let report = encode_motors(200, 40);
        assert_eq!(
            report,
            [0x05, 0x01, 0, 0, 0, 200, 40, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_encode_color_layout() {
        let report = encode_color(10, 20, 30);
        assert_eq!(
            report,
            [0x05, 0x01, 0, 0, 0, 0, 0, 10, 20, 30, 0xFF, 0, 0, 0]
        );
    }

    #[test]
    fn test_encode_clamps() {
        let report = encode_motors(-40, 999);
        assert_eq!(report[OUT_LEFT_MOTOR_INDEX], 0);
        assert_eq!(report[OUT_RIGHT_MOTOR_INDEX], 255);

        let report = encode_color(300, -1, 128);
        assert_eq!(&report[OUT_LED_RED_INDEX..=OUT_LED_BLUE_INDEX], &[255, 0, 128]);
    }

    #[test]
    fn test_combined_report_keeps_both() {
        let report = encode(OutputCommand::SetAll {
            left: 100,
            right: 50,
            color: Rgb {
                red: 1,
                green: 2,
                blue: 3,
            },
        });
        assert_eq!(
            report,
            [0x05, 0x01, 0, 0, 0, 100, 50, 1, 2, 3, 0xFF, 0, 0, 0]
        );
    }
}
