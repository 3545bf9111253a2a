/*!
 * Program Catalog
 *
 * Images that `exec` can load into a process, and the injected choice of
 * which one. Selection is a trait so tests can pin the outcome with a seed
 * or a fixed rotation instead of real randomness.
 */

use crate::core::types::Fd;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A program image `exec` can switch a process to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    pub name: String,
    pub file_descriptors: Vec<Fd>,
}

impl ProgramImage {
    pub fn new(name: impl Into<String>, fds: impl IntoIterator<Item = Fd>) -> Self {
        Self {
            name: name.into(),
            file_descriptors: fds.into_iter().collect(),
        }
    }
}

/// Ordered set of program images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramCatalog {
    programs: Vec<ProgramImage>,
}

impl ProgramCatalog {
    /// Build a catalog; `None` when `programs` is empty
    pub fn new(programs: Vec<ProgramImage>) -> Option<Self> {
        (!programs.is_empty()).then_some(Self { programs })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Never true: construction rejects empty catalogs
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&ProgramImage> {
        self.programs.get(index)
    }

    /// Let `chooser` pick an entry; out-of-range picks wrap around
    pub fn pick(&self, chooser: &mut dyn ProgramChooser) -> &ProgramImage {
        let index = chooser.choose(self.programs.len()) % self.programs.len();
        &self.programs[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProgramImage> + '_ {
        self.programs.iter()
    }
}

impl Default for ProgramCatalog {
    fn default() -> Self {
        Self {
            programs: vec![
                ProgramImage::new("python", [0, 1, 2, 7]),
                ProgramImage::new("node", [0, 1, 2, 8, 9]),
                ProgramImage::new("java", [0, 1, 2, 10, 11, 12]),
                ProgramImage::new("firefox", [0, 1, 2, 13, 14, 15, 16]),
            ],
        }
    }
}

/// Picks which catalog entry `exec` loads
pub trait ProgramChooser: Send {
    /// Return an index in `0..len`; `len` is never zero
    fn choose(&mut self, len: usize) -> usize;
}

/// Uniform random choice, seedable for reproducible runs
#[derive(Debug, Clone)]
pub struct RandomChooser {
    rng: StdRng,
}

impl RandomChooser {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl ProgramChooser for RandomChooser {
    fn choose(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Walks the catalog in order, wrapping around
#[derive(Debug, Clone, Default)]
pub struct CyclingChooser {
    next: usize,
}

impl CyclingChooser {
    pub fn starting_at(index: usize) -> Self {
        Self { next: index }
    }
}

impl ProgramChooser for CyclingChooser {
    fn choose(&mut self, len: usize) -> usize {
        let index = self.next % len;
        self.next = index + 1;
        index
    }
}
