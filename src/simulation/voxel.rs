//! Voxel growth: the first generation pass
//!
//! Roads are planned as a random connected path of voxels. A voxel may only
//! be placed when it has fewer than three occupied voxels around it
//! (diagonals included), which keeps every junction planar.

use glam::IVec3;
use log::{info, warn};
use rand::Rng;

use super::config::GeneratorConfig;

/// The six cardinal directions
pub const CARDINAL_DIRS: [IVec3; 6] = [
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 0, -1),
];

/// All 26 neighbor offsets of a voxel, cardinal and diagonal
pub fn full_dirs() -> impl Iterator<Item = IVec3> {
    (-1..=1).flat_map(|x| {
        (-1..=1).flat_map(move |y| {
            (-1..=1)
                .map(move |z| IVec3::new(x, y, z))
                .filter(|dir| *dir != IVec3::ZERO)
        })
    })
}

/// Dense cubic grid of voxel cells
#[derive(Debug, Clone)]
pub struct VoxelGrid<T> {
    size: usize,
    cells: Vec<T>,
}

impl<T: Clone + Default> VoxelGrid<T> {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![T::default(); size * size * size],
        }
    }
}

impl<T> VoxelGrid<T> {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_bounds(&self, pos: IVec3) -> bool {
        let size = self.size as i32;
        (0..size).contains(&pos.x) && (0..size).contains(&pos.y) && (0..size).contains(&pos.z)
    }

    fn offset(&self, pos: IVec3) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        let size = self.size;
        Some(pos.x as usize + size * (pos.y as usize + size * pos.z as usize))
    }

    pub fn get(&self, pos: IVec3) -> Option<&T> {
        self.offset(pos).map(|index| &self.cells[index])
    }

    /// Returns `false` when `pos` is out of bounds.
    pub fn set(&mut self, pos: IVec3, value: T) -> bool {
        match self.offset(pos) {
            Some(index) => {
                self.cells[index] = value;
                true
            }
            None => false,
        }
    }
}

impl VoxelGrid<bool> {
    /// Occupancy at `pos`, with `outside` standing in for out-of-bounds cells
    pub fn occupied(&self, pos: IVec3, outside: bool) -> bool {
        self.get(pos).copied().unwrap_or(outside)
    }

    /// Occupied cardinal neighbors (out of bounds counts as occupied)
    pub fn cardinal_neighbors(&self, pos: IVec3) -> usize {
        CARDINAL_DIRS
            .iter()
            .filter(|dir| self.occupied(pos + **dir, true))
            .count()
    }

    /// Occupied neighbors among all 26 (out of bounds counts as occupied)
    pub fn all_neighbors(&self, pos: IVec3) -> usize {
        full_dirs().filter(|dir| self.occupied(pos + *dir, true)).count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }
}

/// Result of the growth pass
#[derive(Debug, Clone)]
pub struct VoxelGrowth {
    pub voxels: VoxelGrid<bool>,
    /// Intersection voxels in the order they were found
    pub intersections: Vec<IVec3>,
    pub ticks_used: u32,
    /// True when growth stopped on the tick budget rather than an empty frontier
    pub budget_exhausted: bool,
}

/// Grow a voxel road layout from the center of the grid
pub fn grow_network<R: Rng>(config: &GeneratorConfig, rng: &mut R) -> VoxelGrowth {
    let size = config.voxel_count;
    let mut voxels = VoxelGrid::<bool>::new(size);
    let seed_voxel = IVec3::splat((size / 2) as i32);
    voxels.set(seed_voxel, true);

    let mut active = vec![seed_voxel];
    let mut intersections = Vec::new();

    let mut ticks = 0;
    while !active.is_empty() && ticks < config.max_generation_ticks {
        ticks += 1;
        let index = rng.random_range(0..active.len());
        let pos = active[index];
        let dir = CARDINAL_DIRS[rng.random_range(0..CARDINAL_DIRS.len())];
        let next = pos + dir;

        if !voxels.occupied(next, true) && voxels.all_neighbors(next) < 3 {
            voxels.set(next, true);
            active.push(next);
        }

        if voxels.cardinal_neighbors(pos) >= 3 {
            intersections.push(pos);
            active.swap_remove(index);
        }
    }

    let budget_exhausted = !active.is_empty();
    if budget_exhausted {
        warn!(
            "Voxel growth stopped after {} ticks with {} voxels still active",
            ticks,
            active.len()
        );
    }

    info!(
        "Voxel growth: {} voxels, {} intersections in {} ticks",
        voxels.occupied_count(),
        intersections.len(),
        ticks
    );

    VoxelGrowth {
        voxels,
        intersections,
        ticks_used: ticks,
        budget_exhausted,
    }
}
