const DELETED: u8 = 1 << 0;
const CONSTRAINED: u8 = 1 << 1;
const BLOCKED: u8 = 1 << 2;

/// Bit flags carried by every vertex, edge and face of the mesh.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    flags: u8,
}

impl std::fmt::Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Status({:#06b})", self.flags)
    }
}

impl Status {
    fn check(&self, i: u8) -> bool {
        self.flags & i > 0
    }

    fn set(&mut self, i: u8, flag: bool) {
        if flag {
            self.flags |= i;
        } else {
            self.flags &= !i;
        }
    }

    /// The slot is on the free list.
    pub fn deleted(&self) -> bool {
        self.check(DELETED)
    }

    pub fn set_deleted(&mut self, flag: bool) {
        self.set(DELETED, flag);
    }

    /// The edge is part of an obstacle, border set or the mesh boundary, and
    /// must never be flipped or crossed.
    pub fn constrained(&self) -> bool {
        self.check(CONSTRAINED)
    }

    pub fn set_constrained(&mut self, flag: bool) {
        self.set(CONSTRAINED, flag)
    }

    /// The face lies inside an obstacle.
    pub fn blocked(&self) -> bool {
        self.check(BLOCKED)
    }

    pub fn set_blocked(&mut self, flag: bool) {
        self.set(BLOCKED, flag)
    }
}
