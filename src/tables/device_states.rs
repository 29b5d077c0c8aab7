//! Device-state keywords and the state codes the runtime understands.

pub const OFF: i32 = 0;
pub const ON: i32 = 1;
/// Written when a command set changes only colour or colour loop.
pub const UNKNOWN: i32 = 19;

pub static DEVICE_STATES: &[(&str, i32)] = &[
    ("OFF", OFF),
    ("ON", ON),
    ("DIM1", 2),
    ("DIM2", 3),
    ("DIM3", 4),
    ("DIM4", 5),
    ("DIM5", 6),
    ("DIM6", 7),
    ("DIM7", 8),
    ("DIM8", 9),
    ("DIM9", 10),
    ("DIM10", 11),
    ("DIM11", 12),
    ("DIM12", 13),
    ("DIM13", 14),
    ("DIM14", 15),
    ("DIM15", 16),
    ("DIM16", 17),
    ("DIM17", 18),
];

pub fn lookup(name: &str) -> Option<i32> {
    DEVICE_STATES
        .iter()
        .find(|(state, _)| state.eq_ignore_ascii_case(name))
        .map(|&(_, code)| code)
}

pub fn is_on_or_off(code: i32) -> bool {
    code == ON || code == OFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_lookup() {
        let test_cases = vec![
            ("ON", Some(ON)),
            ("off", Some(OFF)),
            ("Dim1", Some(2)),
            ("DIM17", Some(18)),
            ("DIM18", None),
            ("DIM", None),
        ];

        for (name, expected) in test_cases {
            assert_eq!(lookup(name), expected, "state {name}");
        }
    }

    #[test]
    fn dim_levels_are_not_switch_states() {
        assert!(is_on_or_off(ON));
        assert!(is_on_or_off(OFF));
        assert!(!is_on_or_off(5));
        assert!(!is_on_or_off(UNKNOWN));
    }
}
