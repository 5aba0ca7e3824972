#![no_std]
#![no_main]

use aya_ebpf::{
    bindings::xdp_action,
    macros::{map, xdp},
    maps::XskMap,
    programs::XdpContext,
};
use xsteer_common::MAX_BOUND_QUEUES;

/// Receive queue index → AF_XDP socket. Written only by the control plane
/// through the pinned userspace handle; this program only reads it.
#[map]
static XSK_SOCKETS: XskMap = XskMap::with_max_entries(MAX_BOUND_QUEUES, 0);

#[xdp]
pub fn xsteer(ctx: XdpContext) -> u32 {
    let rx_queue = unsafe { (*ctx.ctx).rx_queue_index };

    // One lookup, two roles: a hit both proves a consumer is listening and
    // names the dispatch slot, always the queue the frame arrived on.
    match XSK_SOCKETS.redirect(rx_queue, 0) {
        Ok(action) => action,
        Err(_) => xdp_action::XDP_PASS,
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 4] = *b"GPL\0";
