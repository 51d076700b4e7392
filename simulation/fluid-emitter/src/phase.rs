//! Particle phase encoding
//!
//! A phase packs a collision group together with behavior flags into one
//! integer. The solver uses it to decide which particles interact and which
//! of them take part in the fluid density solve.

bitflags::bitflags! {
    /// Behavior flags stored in the high bits of a particle phase
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PhaseFlags: i32 {
        /// Particles of the same group collide with each other
        const SELF_COLLIDE = 1 << 24;
        /// Particles contribute to and receive fluid density constraints
        const FLUID = 1 << 25;
    }
}

/// Bits of a phase reserved for the group id
pub const GROUP_MASK: i32 = 0x00FF_FFFF;

/// Combine a group id with behavior flags
#[inline]
pub fn make_phase(group: i32, flags: PhaseFlags) -> i32 {
    (group & GROUP_MASK) | flags.bits()
}

/// Encode the phase tag for an emitter particle
#[inline]
pub fn encode_phase(group: i32, self_collide: bool, is_fluid: bool) -> i32 {
    let mut flags = PhaseFlags::empty();
    flags.set(PhaseFlags::SELF_COLLIDE, self_collide);
    flags.set(PhaseFlags::FLUID, is_fluid);
    make_phase(group, flags)
}

/// Extract the group id from a phase
#[inline]
pub fn phase_group(phase: i32) -> i32 {
    phase & GROUP_MASK
}

/// Extract the behavior flags from a phase
#[inline]
pub fn phase_flags(phase: i32) -> PhaseFlags {
    PhaseFlags::from_bits_truncate(phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_phase_flags() {
        assert_eq!(encode_phase(0, false, false), 0);
        assert_eq!(encode_phase(0, true, false), 1 << 24);
        assert_eq!(encode_phase(0, false, true), 1 << 25);
        assert_eq!(encode_phase(3, true, true), 3 | (1 << 24) | (1 << 25));
    }

    #[test]
    fn test_group_is_masked() {
        let phase = encode_phase(0x0100_0001, false, false);
        assert_eq!(phase_group(phase), 1);
        assert!(phase_flags(phase).is_empty());
    }

    #[test]
    fn test_decode_round() {
        let phase = encode_phase(42, true, false);
        assert_eq!(phase_group(phase), 42);
        assert_eq!(phase_flags(phase), PhaseFlags::SELF_COLLIDE);
    }
}
