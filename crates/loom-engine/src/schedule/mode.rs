/// Quality level of one render pass; also selects the shader branch.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderMode {
    Draft = 0,
    Picking = 1,
    Medium = 2,
    HighPass1 = 3,
    HighPass2 = 4,
}

impl RenderMode {
    pub const ALL: [RenderMode; 5] = [
        RenderMode::Draft,
        RenderMode::Picking,
        RenderMode::Medium,
        RenderMode::HighPass1,
        RenderMode::HighPass2,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_picking(self) -> bool {
        matches!(self, RenderMode::Picking)
    }
}

/// Where a pass draws.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PassTarget {
    Surface,
    Picking,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderPass {
    pub mode: RenderMode,
    pub target: PassTarget,
    /// Clear the target first; otherwise load its contents.
    pub clear: bool,
}

impl RenderPass {
    pub const fn surface(mode: RenderMode, clear: bool) -> Self {
        Self { mode, target: PassTarget::Surface, clear }
    }

    pub const fn picking() -> Self {
        Self { mode: RenderMode::Picking, target: PassTarget::Picking, clear: true }
    }
}

/// Ordered passes to record for one callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramePlan {
    passes: Vec<RenderPass>,
}

impl FramePlan {
    pub fn new(passes: Vec<RenderPass>) -> Self {
        Self { passes }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn draws_surface(&self) -> bool {
        self.passes.iter().any(|p| p.target == PassTarget::Surface)
    }

    pub fn draws_picking(&self) -> bool {
        self.passes.iter().any(|p| p.target == PassTarget::Picking)
    }
}
