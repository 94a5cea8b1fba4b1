//! Screen identifiers for the tab bar.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    Instructors,
    Emails,
    Readers,
    Tags,
    Backups,
}

impl ScreenId {
    /// All screens in tab-bar order.
    pub const ALL: [ScreenId; 5] = [
        Self::Instructors,
        Self::Emails,
        Self::Readers,
        Self::Tags,
        Self::Backups,
    ];

    /// Number key (1-5).
    pub fn number(self) -> u8 {
        match self {
            Self::Instructors => 1,
            Self::Emails => 2,
            Self::Readers => 3,
            Self::Tags => 4,
            Self::Backups => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    /// Next screen in tab order (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous screen in tab order (wraps around).
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Instructors => "Instructors",
            Self::Emails => "Emails",
            Self::Readers => "Readers",
            Self::Tags => "Tags",
            Self::Backups => "Backups",
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_order_wraps_both_ways() {
        assert_eq!(ScreenId::Backups.next(), ScreenId::Instructors);
        assert_eq!(ScreenId::Instructors.prev(), ScreenId::Backups);
        assert_eq!(ScreenId::Emails.next(), ScreenId::Readers);
    }

    #[test]
    fn number_keys_round_trip() {
        for id in ScreenId::ALL {
            assert_eq!(ScreenId::from_number(id.number()), Some(id));
        }
        assert_eq!(ScreenId::from_number(0), None);
        assert_eq!(ScreenId::from_number(6), None);
    }
}
