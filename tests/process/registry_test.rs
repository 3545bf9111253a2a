/*!
 * Process Registry Tests
 * Tests for pid allocation, parent references, and removal rules
 */

use proctree_kernel::process::{check_all_invariants, ProcessRegistry, Topology};
use proctree_kernel::{Operation, Process, ProcessImage, RegistryError, ROOT_PID};
use pretty_assertions::assert_eq;

fn registry_with_shell() -> ProcessRegistry {
    let mut registry = ProcessRegistry::create_root(Topology::init_image());
    let pid = registry.next_pid();
    registry
        .insert(Process::from_image(pid, ROOT_PID, ProcessImage::new("bash")))
        .unwrap();
    registry
}

#[test]
fn test_root_created_once() {
    let registry = ProcessRegistry::create_root(Topology::init_image());
    let root = registry.get(ROOT_PID).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(root.ppid, 0);
    assert_eq!(root.name, "init");
    assert_eq!(root.file_descriptors, vec![0, 1, 2]);
    assert_eq!(root.working_directory, "/");
    assert!(check_all_invariants(&registry).is_empty());
}

#[test]
fn test_pids_never_reused() {
    let mut registry = registry_with_shell();
    registry.remove(2).unwrap();

    let pid = registry.next_pid();
    assert_eq!(pid, 3);
}

#[test]
fn test_insert_duplicate_rejected() {
    let mut registry = registry_with_shell();
    let err = registry
        .insert(Process::from_image(2, ROOT_PID, ProcessImage::new("dup")))
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicatePid(2));
}

#[test]
fn test_insert_dangling_parent_rejected() {
    let mut registry = registry_with_shell();
    let pid = registry.next_pid();
    let err = registry
        .insert(Process::from_image(pid, 40, ProcessImage::new("lost")))
        .unwrap_err();
    assert_eq!(err, RegistryError::NotFound(40));
    assert!(!registry.contains(pid));
}

#[test]
fn test_remove_root_forbidden() {
    let mut registry = registry_with_shell();
    assert_eq!(
        registry.remove(ROOT_PID).unwrap_err(),
        RegistryError::Forbidden {
            pid: ROOT_PID,
            operation: Operation::Remove
        }
    );
    assert!(registry.contains(ROOT_PID));
}

#[test]
fn test_remove_absent() {
    let mut registry = registry_with_shell();
    assert_eq!(registry.remove(9).unwrap_err(), RegistryError::NotFound(9));
}

#[test]
fn test_children_are_derived_from_ppid() {
    let mut registry = registry_with_shell();
    for name in ["vim", "gcc"] {
        let pid = registry.next_pid();
        registry
            .insert(Process::from_image(pid, 2, ProcessImage::new(name)))
            .unwrap();
    }

    assert_eq!(registry.child_pids(2), vec![3, 4]);
    assert_eq!(registry.child_pids(ROOT_PID), vec![2]);
    assert!(registry.child_pids(3).is_empty());
    assert!(registry.child_pids(77).is_empty());
}

#[test]
fn test_snapshot_is_ordered_copy() {
    let mut registry = registry_with_shell();
    let snapshot = registry.snapshot();

    let pid = registry.next_pid();
    registry
        .insert(Process::from_image(pid, 2, ProcessImage::new("vim")))
        .unwrap();

    let pids: Vec<u32> = snapshot.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![1, 2]);
    assert_eq!(registry.snapshot().len(), 3);
}

#[test]
fn test_find_by_name_first_in_pid_order() {
    let mut registry = registry_with_shell();
    let pid = registry.next_pid();
    registry
        .insert(Process::from_image(pid, ROOT_PID, ProcessImage::new("bash")))
        .unwrap();

    assert_eq!(registry.find_by_name("bash").unwrap().pid, 2);
    assert!(registry.find_by_name("zsh").is_none());
}
