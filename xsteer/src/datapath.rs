//! eBPF program lifecycle: load, attach, pin, tear down.

use std::{
    fs,
    path::{Path, PathBuf},
};

use aya::{
    Ebpf, EbpfLoader,
    programs::{Xdp, XdpFlags, xdp::XdpLinkId},
};
use tracing::{debug, info, warn};

use crate::{
    config::{AttachMode, Config},
    control::RedirectTable,
    error::{Result, XsteerError},
};

const PROGRAM_NAME: &str = "xsteer";
const SOCKET_MAP_NAME: &str = "XSK_SOCKETS";

/// The loaded and attached redirect program.
///
/// Holds the kernel state alive for the lifetime of the process; call
/// [`shutdown`](Self::shutdown) to tear it down in order (unpin, then
/// detach).
pub struct Datapath {
    ebpf: Ebpf,
    interface: String,
    link_id: Option<XdpLinkId>,
    pin_path: Option<PathBuf>,
}

impl Datapath {
    /// Load the compiled XDP object into the kernel and attach it to the
    /// configured interface.
    pub fn load(config: &Config) -> Result<Self> {
        bump_memlock_rlimit();

        let mut ebpf = EbpfLoader::new().load(aya::include_bytes_aligned!(concat!(
            env!("OUT_DIR"),
            "/xsteer"
        )))?;

        let program: &mut Xdp = ebpf
            .program_mut(PROGRAM_NAME)
            .ok_or(XsteerError::ProgramNotFound(PROGRAM_NAME))?
            .try_into()?;
        program.load()?;
        debug!(event.name = "datapath.program_loaded", "XDP program loaded");

        let link_id = attach(program, &config.interface, config.attach_mode)?;
        info!(
            event.name = "datapath.attached",
            network.interface.name = %config.interface,
            attach.mode = ?config.attach_mode,
            "XDP program attached"
        );

        Ok(Datapath {
            ebpf,
            interface: config.interface.clone(),
            link_id: Some(link_id),
            pin_path: None,
        })
    }

    /// Take the socket map out of the loaded object, pin it at `pin_path`
    /// for out-of-process control planes, and wrap it in the in-process
    /// binding surface.
    pub fn redirect_table(&mut self, pin_path: &Path) -> Result<RedirectTable> {
        let map = self
            .ebpf
            .take_map(SOCKET_MAP_NAME)
            .ok_or(XsteerError::MapNotFound(SOCKET_MAP_NAME))?;

        // A pin left behind by a previous run would make this one fail.
        if pin_path.exists() {
            fs::remove_file(pin_path)?;
            debug!(
                event.name = "datapath.stale_pin_removed",
                pin.path = %pin_path.display(),
                "removed stale map pin"
            );
        }

        map.pin(pin_path)?;
        info!(
            event.name = "datapath.map_pinned",
            pin.path = %pin_path.display(),
            "socket map pinned for the control plane"
        );
        self.pin_path = Some(pin_path.to_path_buf());

        RedirectTable::from_map(map)
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Remove the map pin and detach the program. Unpin failures are logged
    /// and do not prevent the detach.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(path) = self.pin_path.take() {
            match fs::remove_file(&path) {
                Ok(()) => info!(
                    event.name = "datapath.map_unpinned",
                    pin.path = %path.display(),
                    "socket map unpinned"
                ),
                Err(e) => warn!(
                    event.name = "datapath.unpin_failed",
                    pin.path = %path.display(),
                    error = %e,
                    "failed to remove map pin"
                ),
            }
        }

        if let Some(link_id) = self.link_id.take() {
            let program: &mut Xdp = self
                .ebpf
                .program_mut(PROGRAM_NAME)
                .ok_or(XsteerError::ProgramNotFound(PROGRAM_NAME))?
                .try_into()?;
            program.detach(link_id)?;
            info!(
                event.name = "datapath.detached",
                network.interface.name = %self.interface,
                "XDP program detached"
            );
        }

        Ok(())
    }
}

fn attach(program: &mut Xdp, interface: &str, mode: AttachMode) -> Result<XdpLinkId> {
    let flags = match mode {
        AttachMode::Auto | AttachMode::Driver => XdpFlags::DRV_MODE,
        AttachMode::Skb => XdpFlags::SKB_MODE,
        AttachMode::Hw => XdpFlags::HW_MODE,
    };

    match program.attach(interface, flags) {
        Ok(link_id) => Ok(link_id),
        Err(e) if mode == AttachMode::Auto => {
            warn!(
                event.name = "datapath.attach_fallback",
                network.interface.name = %interface,
                error = %e,
                "native driver attach failed, falling back to generic mode"
            );
            Ok(program.attach(interface, XdpFlags::SKB_MODE)?)
        }
        Err(e) => Err(e.into()),
    }
}

// Bump the memlock rlimit. This is needed for older kernels that don't use
// the new memcg based accounting, see https://lwn.net/Articles/837122/
fn bump_memlock_rlimit() {
    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!(
            event.name = "datapath.rlimit_failed",
            error.code = ret,
            "remove limit on locked memory failed"
        );
    }
}
