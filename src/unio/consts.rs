/// Start-of-frame byte transmitted after the header low period.
pub const START_HEADER: u8 = 0x55;

/// Device address of the 11AA/11LC EEPROM family.
pub const EEPROM_ADDRESS: u8 = 0xa0;

pub const READ_OPCODE: u8 = 0x03;
pub const CURRENT_ADDRESS_READ_OPCODE: u8 = 0x06;
pub const WRITE_OPCODE: u8 = 0x6c;
pub const WRITE_ENABLE_OPCODE: u8 = 0x96;
pub const WRITE_DISABLE_OPCODE: u8 = 0x91;
pub const READ_STATUS_OPCODE: u8 = 0x05;
pub const WRITE_STATUS_OPCODE: u8 = 0x6e;
// defined by the device but not wired into the operation layer
pub const ERASE_ALL_OPCODE: u8 = 0x6d;
pub const SET_ALL_OPCODE: u8 = 0x67;

// The following are defined in the datasheet as _minimum_ times, in
// microseconds. There is no maximum.
pub const STANDBY_PULSE_US: u32 = 600; // Tstby
pub const COMMAND_GAP_US: u32 = 10; // Tss
pub const HEADER_LOW_US: u32 = 5; // Thdr

pub const QUARTER_BIT_US: u32 = 10;

/// Added to every minimum time above, to be on the safe side.
pub const TIMING_MARGIN_US: u32 = 5;

/// A single write command must not cross a page boundary.
pub const PAGE_SIZE: usize = 16;

/// Write-in-progress bit of the status register.
pub const STATUS_WIP: u8 = 0x01;
/// Write-enable-latch bit of the status register.
pub const STATUS_WEL: u8 = 0x02;
