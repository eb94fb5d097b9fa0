bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputFlags: u8 {
        const FORWARD = 1 << 0;
        const BACK = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const SPRINT = 1 << 4;
        /// Edge: set only on the tick the jump key went down.
        const JUMP = 1 << 5;
        /// Edge: set only on the tick the toggle key went down.
        const MODE_TOGGLE = 1 << 6;
    }
}

/// One tick of input for a controlled entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementInput {
    pub flags: InputFlags,
    /// Look change in degrees, (horizontal, vertical).
    pub look_h: f32,
    pub look_v: f32,
}

impl MovementInput {
    pub fn new(flags: InputFlags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    pub fn with_look(mut self, look_h: f32, look_v: f32) -> Self {
        self.look_h = look_h;
        self.look_v = look_v;
        self
    }

    /// (forward, left) axis values in `[-1, 1]`.
    pub fn move_axes(&self) -> (f32, f32) {
        let axis = |pos: InputFlags, neg: InputFlags| {
            self.flags.contains(pos) as i8 as f32 - self.flags.contains(neg) as i8 as f32
        };
        (
            axis(InputFlags::FORWARD, InputFlags::BACK),
            axis(InputFlags::LEFT, InputFlags::RIGHT),
        )
    }

    pub fn sprint(&self) -> bool {
        self.flags.contains(InputFlags::SPRINT)
    }

    pub fn jump(&self) -> bool {
        self.flags.contains(InputFlags::JUMP)
    }

    pub fn mode_toggle(&self) -> bool {
        self.flags.contains(InputFlags::MODE_TOGGLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposing_keys_cancel() {
        let input = MovementInput::new(InputFlags::FORWARD | InputFlags::BACK | InputFlags::RIGHT);
        assert_eq!(input.move_axes(), (0.0, -1.0));
    }

    #[test]
    fn test_edges() {
        let input = MovementInput::new(InputFlags::JUMP | InputFlags::SPRINT);
        assert!(input.jump());
        assert!(input.sprint());
        assert!(!input.mode_toggle());
    }
}
