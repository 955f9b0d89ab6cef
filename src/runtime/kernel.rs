//! Kernel launch geometry
//!
//! Kernels are launched over a one-dimensional grid of work groups. Each group
//! has `block_size` lanes; lanes are further organised into wavefronts of the
//! device's native width. A kernel body receives a [`BlockIdx`] and iterates
//! its lanes itself, which lets cooperative steps (group-local scratch,
//! segment reductions) be written as ordinary sequential phases.

/// A kernel body, invoked once per work group
pub type Kernel<'a> = dyn Fn(BlockIdx) + Send + Sync + 'a;

/// Grid and group dimensions of a launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Number of work groups
    pub grid_size: usize,
    /// Lanes per work group
    pub block_size: usize,
}

impl LaunchConfig {
    /// Enough groups of `block_size` lanes to give one lane per item
    #[inline]
    pub fn for_items(items: usize, block_size: usize) -> Self {
        Self {
            grid_size: items.div_ceil(block_size.max(1)),
            block_size,
        }
    }

    /// Enough groups to give `per_block` items to each group
    #[inline]
    pub fn for_groups(items: usize, per_block: usize, block_size: usize) -> Self {
        Self {
            grid_size: items.div_ceil(per_block.max(1)),
            block_size,
        }
    }

    /// Total number of lanes in the launch
    #[inline]
    pub fn total_lanes(&self) -> usize {
        self.grid_size * self.block_size
    }
}

/// Position of a work group within a launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIdx {
    /// Index of this group in the grid
    pub block_id: usize,
    /// Lanes in this group
    pub block_size: usize,
    /// Number of groups in the grid
    pub grid_size: usize,
}

impl BlockIdx {
    pub(crate) fn new(block_id: usize, config: LaunchConfig) -> Self {
        Self {
            block_id,
            block_size: config.block_size,
            grid_size: config.grid_size,
        }
    }

    /// Global lane id of lane `tid` in this group
    #[inline]
    pub fn global_id(&self, tid: usize) -> usize {
        self.block_id * self.block_size + tid
    }

    /// Iterator over the lanes of this group
    #[inline]
    pub fn lanes(&self) -> std::ops::Range<usize> {
        0..self.block_size
    }
}
