//! Volatile register access.

/// Byte-addressed volatile access to the peripheral and flash address space.
///
/// Drivers in this crate are generic over `Bus` so that register sequencing
/// can be exercised against a software register file on the host in addition
/// to the memory-mapped implementation, [`Mmio`].
pub trait Bus {
    /// Read one byte.
    fn read8(&mut self, addr: u32) -> u8;
    /// Write one byte.
    fn write8(&mut self, addr: u32, val: u8);
    /// Read a half-word.
    fn read16(&mut self, addr: u32) -> u16;
    /// Write a half-word.
    fn write16(&mut self, addr: u32, val: u16);
    /// Read a word.
    fn read32(&mut self, addr: u32) -> u32;
    /// Write a word.
    fn write32(&mut self, addr: u32, val: u32);

    /// Read-modify-write one byte.
    fn modify8(&mut self, addr: u32, f: impl FnOnce(u8) -> u8) {
        let val: u8 = self.read8(addr);
        self.write8(addr, f(val));
    }

    /// Read-modify-write a half-word.
    fn modify16(&mut self, addr: u32, f: impl FnOnce(u16) -> u16) {
        let val: u16 = self.read16(addr);
        self.write16(addr, f(val));
    }

    /// Read-modify-write a word.
    fn modify32(&mut self, addr: u32, f: impl FnOnce(u32) -> u32) {
        let val: u32 = self.read32(addr);
        self.write32(addr, f(val));
    }
}

/// Physical memory-mapped implementation of [`Bus`].
///
/// # Example
///
/// ```no_run
/// use ch32v20x_hal::bus::Mmio;
///
/// // safety: no other code in this program touches the register blocks
/// // accessed through this handle
/// let mut bus: Mmio = unsafe { Mmio::steal() };
/// ```
#[derive(Debug)]
pub struct Mmio {
    _priv: (),
}

impl Mmio {
    /// Create a new memory-mapped bus handle.
    ///
    /// # Safety
    ///
    /// The caller must guarantee exclusive access to the register blocks
    /// reached through this handle for as long as it is used; aliased
    /// read-modify-write sequences on the same register are data races.
    #[inline]
    pub const unsafe fn steal() -> Self {
        Mmio { _priv: () }
    }
}

impl Bus for Mmio {
    #[inline]
    fn read8(&mut self, addr: u32) -> u8 {
        unsafe { (addr as *const u8).read_volatile() }
    }

    #[inline]
    fn write8(&mut self, addr: u32, val: u8) {
        unsafe { (addr as *mut u8).write_volatile(val) }
    }

    #[inline]
    fn read16(&mut self, addr: u32) -> u16 {
        unsafe { (addr as *const u16).read_volatile() }
    }

    #[inline]
    fn write16(&mut self, addr: u32, val: u16) {
        unsafe { (addr as *mut u16).write_volatile(val) }
    }

    #[inline]
    fn read32(&mut self, addr: u32) -> u32 {
        unsafe { (addr as *const u32).read_volatile() }
    }

    #[inline]
    fn write32(&mut self, addr: u32, val: u32) {
        unsafe { (addr as *mut u32).write_volatile(val) }
    }
}
