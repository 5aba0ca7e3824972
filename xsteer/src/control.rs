//! Control-plane surface for the queue → socket table.

use std::{os::fd::AsRawFd, path::Path};

use aya::maps::{Map, MapData, XskMap};
use tracing::{debug, info};
use xsteer_common::{QueueRegistry, Verdict};

use crate::error::{Result, XsteerError};

/// Queue → socket bindings, as seen and mutated by the control plane.
///
/// Owns the userspace handle to the kernel `XSK_SOCKETS` map plus a
/// [`QueueRegistry`] shadow. XSKMAP entries cannot be read back from
/// userspace, so the shadow answers queries; every mutation goes through
/// [`bind`](Self::bind) / [`unbind`](Self::unbind), which keep the two in
/// step. Single-writer discipline: one `RedirectTable` per map, mutated from
/// one place. The datapath never writes.
pub struct RedirectTable {
    xsk_map: XskMap<MapData>,
    registry: QueueRegistry,
}

impl RedirectTable {
    /// Wrap a map taken out of a freshly loaded eBPF object.
    pub fn from_map(map: Map) -> Result<Self> {
        let xsk_map = XskMap::try_from(map)?;
        Ok(RedirectTable {
            xsk_map,
            registry: QueueRegistry::new(),
        })
    }

    /// Open the socket map through its bpffs pin. This is how an
    /// out-of-process control plane reaches the table; the loader keeps
    /// running independently and never observes the mutations except through
    /// the datapath itself.
    pub fn open_pinned(path: impl AsRef<Path>) -> Result<Self> {
        let data = MapData::from_pin(path)?;
        let xsk_map = XskMap::try_from(Map::XskMap(data))?;
        Ok(RedirectTable {
            xsk_map,
            registry: QueueRegistry::new(),
        })
    }

    /// Bind `socket` to `queue`. Frames arriving on `queue` are redirected
    /// to the socket from the next lookup onward. Rebinding a queue replaces
    /// its socket; the replaced fd is returned. Queues beyond the table
    /// capacity are rejected with no effect on existing bindings.
    pub fn bind(&mut self, queue: u32, socket: &impl AsRawFd) -> Result<Option<u32>> {
        let fd = socket.as_raw_fd();
        let replaced = self
            .registry
            .bind(queue, fd as u32)
            .map_err(|source| XsteerError::Bind { queue, source })?;

        if let Err(e) = self.xsk_map.set(queue, fd, 0) {
            // Kernel refused the entry; put the shadow back the way it was.
            match replaced {
                Some(prev) => {
                    let _ = self.registry.bind(queue, prev);
                }
                None => {
                    self.registry.unbind(queue);
                }
            }
            return Err(e.into());
        }

        info!(
            event.name = "control.bound",
            xsk.queue = queue,
            xsk.socket_fd = fd,
            replaced = replaced.is_some(),
            "socket bound to receive queue"
        );
        Ok(replaced)
    }

    /// Remove the binding for `queue`, if any, returning the fd of the
    /// socket that was bound. Unbinding an unbound queue is a no-op.
    pub fn unbind(&mut self, queue: u32) -> Result<Option<u32>> {
        if self.registry.lookup(queue).is_none() {
            debug!(
                event.name = "control.unbind_miss",
                xsk.queue = queue,
                "no binding to remove"
            );
            return Ok(None);
        }

        self.xsk_map.unset(queue)?;
        let removed = self.registry.unbind(queue);
        info!(
            event.name = "control.unbound",
            xsk.queue = queue,
            "socket unbound from receive queue"
        );
        Ok(removed)
    }

    /// Socket fd currently bound to `queue`.
    pub fn socket(&self, queue: u32) -> Option<u32> {
        self.registry.lookup(queue)
    }

    /// What the datapath will do with a frame arriving on `queue`, given the
    /// current bindings.
    pub fn decide(&self, queue: u32) -> Verdict {
        self.registry.decide(queue)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
