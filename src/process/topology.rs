/*!
 * Seed Topology
 * The starting process tree, supplied by the caller rather than the engine
 */

use crate::core::limits::ROOT_NAME;
use crate::core::types::environment;
use crate::process::types::ProcessImage;

/// One seeded descendant of the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedProcess {
    /// Name of an earlier seeded process (or the root) to attach to
    pub parent: String,
    pub image: ProcessImage,
}

/// Root image plus descendants, in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub root: ProcessImage,
    pub descendants: Vec<SeedProcess>,
}

impl Topology {
    /// Only the root process
    pub fn root_only(root: ProcessImage) -> Self {
        Self {
            root,
            descendants: Vec::new(),
        }
    }

    /// Attach `image` under the process seeded with name `parent`
    #[must_use]
    pub fn with_child(mut self, parent: impl Into<String>, image: ProcessImage) -> Self {
        self.descendants.push(SeedProcess {
            parent: parent.into(),
            image,
        });
        self
    }

    /// The default root image: `init` with stdio and a root environment
    pub fn init_image() -> ProcessImage {
        ProcessImage::new(ROOT_NAME)
            .with_fds([0, 1, 2])
            .with_env(environment([("PATH", "/bin:/usr/bin"), ("USER", "root")]))
            .with_working_dir("/")
    }

    /// A shell with an editor and a compiler running under it
    pub fn classroom() -> Self {
        let shell_env = environment([
            ("PATH", "/bin:/usr/bin"),
            ("USER", "student"),
            ("HOME", "/home/student"),
        ]);

        let bash = ProcessImage::new("bash")
            .with_fds([0, 1, 2, 3])
            .with_env(shell_env.clone())
            .with_working_dir("/home/student");
        let vim = ProcessImage::new("vim")
            .with_fds([0, 1, 2, 4])
            .with_env(shell_env.clone())
            .with_var("EDITOR", "vim")
            .with_working_dir("/home/student");
        let gcc = ProcessImage::new("gcc")
            .with_fds([0, 1, 2, 5, 6])
            .with_env(shell_env)
            .with_working_dir("/home/student");

        Self::root_only(Self::init_image())
            .with_child(ROOT_NAME, bash)
            .with_child("bash", vim)
            .with_child("bash", gcc)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::root_only(Self::init_image())
    }
}
