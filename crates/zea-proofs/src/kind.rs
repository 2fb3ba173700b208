//! Circuit kinds and their parameter-cache directories.

/// The six circuit kinds with independently generated parameters.
///
/// Arity is baked into the constraint system at compile time, so each N is
/// its own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitKind {
    /// One-input, one-output transfer.
    Transfer1,
    /// Two-input, two-output transfer.
    Transfer2,
    /// Three-input, three-output transfer.
    Transfer3,
    /// Bid registration.
    Register,
    /// Two-slot auction clearing.
    Auction2,
    /// Three-slot auction clearing.
    Auction3,
}

impl CircuitKind {
    /// All kinds, in setup order.
    pub const ALL: [Self; 6] = [
        Self::Transfer1,
        Self::Transfer2,
        Self::Transfer3,
        Self::Register,
        Self::Auction2,
        Self::Auction3,
    ];

    /// The cache directory name for this kind.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Transfer1 => "transfer1",
            Self::Transfer2 => "transfer2",
            Self::Transfer3 => "transfer3",
            Self::Register => "register",
            Self::Auction2 => "auction2",
            Self::Auction3 => "auction3",
        }
    }

    /// The transfer kind for a slot count, if supported.
    #[must_use]
    pub const fn transfer_for_arity(arity: usize) -> Option<Self> {
        match arity {
            1 => Some(Self::Transfer1),
            2 => Some(Self::Transfer2),
            3 => Some(Self::Transfer3),
            _ => None,
        }
    }

    /// The auction kind for a slot count, if supported.
    #[must_use]
    pub const fn auction_for_arity(arity: usize) -> Option<Self> {
        match arity {
            2 => Some(Self::Auction2),
            3 => Some(Self::Auction3),
            _ => None,
        }
    }
}

impl core::fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_lookup() {
        assert_eq!(CircuitKind::transfer_for_arity(1), Some(CircuitKind::Transfer1));
        assert_eq!(CircuitKind::transfer_for_arity(3), Some(CircuitKind::Transfer3));
        assert_eq!(CircuitKind::transfer_for_arity(4), None);
        assert_eq!(CircuitKind::auction_for_arity(2), Some(CircuitKind::Auction2));
        assert_eq!(CircuitKind::auction_for_arity(1), None);
    }

    #[test]
    fn dir_names_are_distinct() {
        let mut names: Vec<&str> = CircuitKind::ALL.iter().map(|k| k.dir_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CircuitKind::ALL.len());
    }
}
