/// Master side of the Microchip UNI/O bus, as spoken by the 11AA/11LC
/// family of serial EEPROMs (e.g. 11AA080, 8 kbit organized as 1024 x 8).
///
/// A single open-drain line with a passive pull-up carries clock and data
/// in both directions. Each bit occupies a fixed slot of four quarter-bit
/// periods and is Manchester-encoded: low-then-high is a "1",
/// high-then-low is a "0". The same slot code path serves both roles;
/// while transmitting we sample our own drive at 1/4 and 3/4 of the slot,
/// while receiving we latch a dummy "1" pattern and the slave determines
/// what the samples see.
///
/// Framing:
/// - Standby pulse: line low for Tss, then high for Tstby, resets the
///   slave state machine.
/// - Start header: line low for Thdr, then the byte 0x55 with MAK.
/// - Every byte is 8 data bits MSB first, one MAK/NoMAK bit from the
///   sender ("more bytes follow" / "this phase is over"), and one SAK
///   slot where the addressed slave acknowledges.
/// - Command: device address byte, opcode byte, optionally a 16-bit
///   big-endian memory address and a payload.
///
/// A write command must stay within one 16-byte page; the orchestration
/// for longer writes lives in `operations`.

mod hardware;
mod low_level;
mod operations;

pub mod consts;

pub use self::hardware::{
	Hardware,
	LineDirection,
	reliable_sleep,
};

pub use self::low_level::{
	BusGrant,
	LowLevel,
};

pub use self::operations::{
	EepromOperations,
};
