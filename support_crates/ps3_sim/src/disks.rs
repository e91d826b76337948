use geom::{Disk, DiskRegistry};
use std::collections::BTreeMap;

/// Identifies a disk registered with [`SimDisks`].
///
/// It cannot be cloned, so a disk can only be destroyed once.
#[derive(Debug, Eq, PartialEq)]
pub struct DiskHandle(u32);

/// A disk framework that only remembers which disks exist
#[derive(Debug, Default)]
pub struct SimDisks {
    next_id: u32,
    live: BTreeMap<u32, Disk>,
    destroyed: usize,
}

impl SimDisks {
    /// The disks that are currently registered, oldest first
    pub fn registered(&self) -> Vec<Disk> {
        self.live.values().copied().collect()
    }

    /// How many disks have been destroyed so far
    pub fn destroyed(&self) -> usize {
        self.destroyed
    }
}

impl DiskRegistry for SimDisks {
    type Handle = DiskHandle;

    fn disk_create(&mut self, disk: Disk) -> Self::Handle {
        assert!(
            !self
                .live
                .values()
                .any(|d| d.name == disk.name && d.unit == disk.unit),
            "{}{} is already registered",
            disk.name,
            disk.unit
        );
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id, disk);
        DiskHandle(id)
    }

    fn disk_destroy(&mut self, handle: Self::Handle) {
        if self.live.remove(&handle.0).is_none() {
            panic!("{handle:?} does not belong to this registry");
        }
        self.destroyed += 1;
    }
}
