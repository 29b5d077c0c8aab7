//! Physical address codes for the powerline protocol and the runtime's
//! device type numbering.

use serde::Serialize;

/// Protocol code for house letters `A`..=`P`, in letter order.
const HOUSE_CODES: [i32; 16] = [
    0x06, 0x0E, 0x02, 0x0A, 0x01, 0x09, 0x05, 0x0D, 0x07, 0x0F, 0x03, 0x0B, 0x00, 0x08, 0x04, 0x0C,
];

/// Protocol code for units `1`..=`16`.
const UNIT_CODES: [i32; 16] = [
    0x0C, 0x1C, 0x04, 0x14, 0x02, 0x12, 0x0A, 0x1A, 0x0E, 0x1E, 0x06, 0x16, 0x00, 0x10, 0x08, 0x18,
];

pub const FIRST_UNIT: i64 = 1;
pub const LAST_UNIT: i64 = 16;

/// Placeholder hub address written for devices that are not hub-addressed.
pub const NO_HUB_ADDRESS: &str = "00:00:00:00:00:00:00:00-00";

pub fn is_house_letter(c: char) -> bool {
    ('A'..='P').contains(&c)
}

/// `None` for anything outside `A`..=`P`.
pub fn house_code(letter: char) -> Option<i32> {
    is_house_letter(letter).then(|| HOUSE_CODES[(letter as u8 - b'A') as usize])
}

pub fn unit_code(unit: i64) -> Option<i32> {
    if (FIRST_UNIT..=LAST_UNIT).contains(&unit) {
        Some(UNIT_CODES[(unit - FIRST_UNIT) as usize])
    } else {
        None
    }
}

/// Hub addresses look like `00:17:88:01:00:bd:c7:b9-0b`: eight lowercase hex
/// pairs separated by `:`, a `-`, then a final pair.
pub fn is_hub_address(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != NO_HUB_ADDRESS.len() {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| match i {
        23 => b == b'-',
        i if i % 3 == 2 => b == b':',
        _ => b.is_ascii_digit() || (b'a'..=b'f').contains(&b),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceCategory {
    Appliance,
    Lamp,
    ApplianceLamp,
    HueLamp,
    Sensor,
    Remote,
}

impl DeviceCategory {
    /// Type number the runtime expects in the device table.
    pub fn code(self) -> i32 {
        match self {
            DeviceCategory::Appliance => 0,
            DeviceCategory::Lamp => 1,
            DeviceCategory::ApplianceLamp => 2,
            DeviceCategory::HueLamp => 3,
            DeviceCategory::Sensor => 4,
            DeviceCategory::Remote => 5,
        }
    }

    pub fn is_hub_addressed(self) -> bool {
        self == DeviceCategory::HueLamp
    }
}
