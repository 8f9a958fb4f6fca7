//! On-chip flash erase/program/verify demonstration.
//!
//! Runs the standard program-and-verify pass over a 4 KiB region, then the
//! fast mode pass over a 32 KiB block, reporting both results on the USART1
//! console, and finishes with a walk through the three erase granularities.
//!
//! Interrupts are masked and the AHB clock halved for the duration of each
//! flash sequence.

#![no_std]
#![no_main]

use ch32v20x_hal::{
    bus::{Bus, Mmio},
    flash::{Block, FastPage, Flash, Page},
    rcc::HclkDiv2,
    selftest::{self, FastReport, Report},
    uart::Uart1,
};
use core::fmt::Write;
use panic_halt as _;

const SYSCLK_HZ: u32 = 144_000_000;
const BAUD: u32 = 115_200;

// standard mode test region
const PAGE_WRITE_START_ADDR: u32 = 0x0800_8000;
const PAGE_WRITE_END_ADDR: u32 = 0x0800_9000;

// fast mode test region
const FAST_PROGRAM_START_ADDR: u32 = 0x0800_8000;

const TEST_BLOCK: Block = match Block::from_addr(FAST_PROGRAM_START_ADDR) {
    Some(block) => block,
    None => panic!("test block is not 32 KiB aligned"),
};
const TEST_PAGE: Page = match Page::from_addr(FAST_PROGRAM_START_ADDR) {
    Some(page) => page,
    None => panic!("test page is not 4 KiB aligned"),
};
const TEST_FAST_PAGE: FastPage = match FastPage::from_addr(FAST_PROGRAM_START_ADDR) {
    Some(page) => page,
    None => panic!("test page is not 256 B aligned"),
};

#[qingke_rt::entry]
fn main() -> ! {
    let mut console: Uart1<Mmio> = Uart1::console(unsafe { Mmio::steal() }, SYSCLK_HZ, BAUD);
    let _ = writeln!(console, "SystemClk:{SYSCLK_HZ}");
    let _ = writeln!(console, "Flash Program Test");

    let report: Report = riscv::interrupt::free(|| {
        let _div = HclkDiv2::enter(unsafe { Mmio::steal() });
        let mut bus = unsafe { Mmio::steal() };
        selftest::program_verify(&mut bus, PAGE_WRITE_START_ADDR..PAGE_WRITE_END_ADDR, 0xAAAA)
    });
    if report.passed() {
        let _ = writeln!(console, "Memory Program PASS!");
    } else {
        let _ = writeln!(console, "Memory Program FAIL!");
    }

    let _ = writeln!(console, "Flash Fast Mode Test");
    let fast: FastReport = riscv::interrupt::free(|| {
        let _div = HclkDiv2::enter(unsafe { Mmio::steal() });
        let mut bus = unsafe { Mmio::steal() };
        selftest::fast_program_verify(&mut bus, TEST_BLOCK)
    });
    if fast.passed() {
        let _ = writeln!(console, "Program 32KByte suc");
    } else {
        let _ = writeln!(console, "Program fail");
    }

    // erase granularity walkthrough; the read-back is for inspection only
    let _ = writeln!(console, "Erase 256Byte...");
    riscv::interrupt::free(|| {
        let _div = HclkDiv2::enter(unsafe { Mmio::steal() });
        let mut bus = unsafe { Mmio::steal() };
        let mut flash = Flash::unlock_fast(&mut bus);
        let _ = flash.erase_page_fast(TEST_FAST_PAGE);
    });
    dump(&mut console, FAST_PROGRAM_START_ADDR, FastPage::SIZE);

    let _ = writeln!(console, "Erase 4KByte...");
    riscv::interrupt::free(|| {
        let _div = HclkDiv2::enter(unsafe { Mmio::steal() });
        let mut bus = unsafe { Mmio::steal() };
        let mut flash = Flash::unlock(&mut bus);
        let _ = flash.erase_page(TEST_PAGE);
    });
    dump(&mut console, FAST_PROGRAM_START_ADDR, Page::SIZE);

    let _ = writeln!(console, "Erase 32KByte...");
    riscv::interrupt::free(|| {
        let _div = HclkDiv2::enter(unsafe { Mmio::steal() });
        let mut bus = unsafe { Mmio::steal() };
        let mut flash = Flash::unlock_fast(&mut bus);
        let _ = flash.erase_block_32k(TEST_BLOCK);
    });
    dump(&mut console, FAST_PROGRAM_START_ADDR, Block::SIZE);

    loop {}
}

/// Print the first and last words of the `len` bytes at `addr`.
fn dump(console: &mut Uart1<Mmio>, addr: u32, len: u32) {
    let mut bus = unsafe { Mmio::steal() };
    for word_addr in [addr, addr + len - 4] {
        let _ = write!(console, "{:08x} ", bus.read32(word_addr));
    }
    let _ = writeln!(console);
}
