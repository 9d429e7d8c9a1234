use crate::status::{StatusField, StatusRecord};

/// Which field a single activation changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Owned,
    Enhancement,
    Potential,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Owned, Mode::Enhancement, Mode::Potential];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "owned" => Some(Mode::Owned),
            "eza" | "enhancement" => Some(Mode::Enhancement),
            "pot" | "potential" => Some(Mode::Potential),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Owned => "Owned",
            Mode::Enhancement => "EZA",
            Mode::Potential => "Potential",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Mode::Owned => Mode::Enhancement,
            Mode::Enhancement => Mode::Potential,
            Mode::Potential => Mode::Owned,
        }
    }

    /// The field assignment one activation of `record` produces. Every state
    /// has a successor.
    pub fn activation(self, record: &StatusRecord) -> StatusField {
        match self {
            Mode::Owned => StatusField::Owned(!record.owned),
            Mode::Enhancement => StatusField::Enhancement(record.enhancement.next()),
            Mode::Potential => StatusField::Potential(record.potential.next()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(mode: Mode, times: usize) -> Vec<StatusRecord> {
        let mut record = StatusRecord::default();
        let mut steps = Vec::new();
        for _ in 0..times {
            record.apply(mode.activation(&record));
            steps.push(record);
        }
        steps
    }

    #[test]
    fn owned_toggles() {
        let steps = run(Mode::Owned, 2);
        assert!(steps[0].owned);
        assert!(!steps[1].owned);
    }

    #[test]
    fn enhancement_returns_to_zero_after_three() {
        let values: Vec<u8> = run(Mode::Enhancement, 3)
            .iter()
            .map(|record| record.enhancement.value())
            .collect();
        assert_eq!(values, vec![1, 2, 0]);
    }

    #[test]
    fn potential_cycles_through_five_states() {
        let values: Vec<u8> = run(Mode::Potential, 5)
            .iter()
            .map(|record| record.potential.value())
            .collect();
        assert_eq!(values, vec![1, 2, 3, 4, 0]);
    }

    #[test]
    fn activation_touches_one_field() {
        let steps = run(Mode::Potential, 1);
        assert!(!steps[0].owned);
        assert_eq!(steps[0].enhancement.value(), 0);
    }

    #[test]
    fn parse_accepts_short_and_long_names() {
        assert_eq!(Mode::parse("EZA"), Some(Mode::Enhancement));
        assert_eq!(Mode::parse("potential"), Some(Mode::Potential));
        assert_eq!(Mode::parse("owned"), Some(Mode::Owned));
        assert_eq!(Mode::parse("rainbow"), None);
        assert_eq!(Mode::Potential.next(), Mode::Owned);
    }
}
