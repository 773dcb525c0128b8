use std::fmt;
use std::ops::BitOr;

/// Highest valid force-group index.
pub const MAX_FORCE_GROUP: u8 = 31;

/// A bitmask selecting force groups; bit `g` selects group `g`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForceGroupMask(u32);

impl ForceGroupMask {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Mask containing only `group`, or `None` if the group is out of range.
    pub fn single(group: u8) -> Option<Self> {
        (group <= MAX_FORCE_GROUP).then(|| Self(1 << group))
    }

    /// Mask containing every listed group, or `None` if any group is out of range.
    pub fn from_groups<I>(groups: I) -> Option<Self>
    where
        I: IntoIterator<Item = u8>,
    {
        groups
            .into_iter()
            .try_fold(Self::NONE, |mask, group| mask.with_group(group))
    }

    pub fn with_group(self, group: u8) -> Option<Self> {
        Self::single(group).map(|single| self | single)
    }

    #[inline]
    pub fn contains(self, group: u8) -> bool {
        group <= MAX_FORCE_GROUP && self.0 & (1 << group) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for ForceGroupMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for ForceGroupMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for ForceGroupMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForceGroupMask({:#034b})", self.0)
    }
}
