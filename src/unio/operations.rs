use super::consts::*;
use super::hardware::{
	Hardware,
	LineDirection,
};
use super::low_level::LowLevel;

// A page write cycle is a few milliseconds; with roughly a millisecond
// per status poll this is far beyond any healthy device.
const MAX_STATUS_POLLS: u32 = 4096;

/// One method per device command, plus the paged-write orchestration.
///
/// Every operation is a full transaction: standby pulse, then header,
/// command bytes and payload inside a single `BusGrant` critical
/// section. A missing slave acknowledge aborts the operation at once;
/// there is no retry at this layer.
pub trait EepromOperations: LowLevel {
	/// Leave the bus in its idle state: driven high.
	fn init(&mut self) {
		self.set_direction(LineDirection::Drive);
		self.set_line(true);
	}

	fn read(&mut self, device: u8, address: u16, target: &mut [u8]) -> crate::AResult<()> {
		let command = [device, READ_OPCODE, (address >> 8) as u8, address as u8];
		self.standby_pulse();
		let mut bus = self.grant();
		bus.start_header();
		bus.send_bytes(&command, false)?;
		bus.receive_bytes(target)?;
		Ok(())
	}

	/// Write within a single page. A span crossing a page boundary is
	/// rejected before any signal is placed on the line; the device
	/// would wrap inside the page and clobber unrelated bytes.
	fn start_write(&mut self, device: u8, address: u16, data: &[u8]) -> crate::AResult<()> {
		ensure!(
			(address as usize % PAGE_SIZE) + data.len() <= PAGE_SIZE,
			"write of {} bytes at 0x{:04x} would cross a page boundary", data.len(), address
		);
		let command = [device, WRITE_OPCODE, (address >> 8) as u8, address as u8];
		self.standby_pulse();
		let mut bus = self.grant();
		bus.start_header();
		bus.send_bytes(&command, false)?;
		bus.send_bytes(data, true)?;
		Ok(())
	}

	fn enable_write(&mut self, device: u8) -> crate::AResult<()> {
		let command = [device, WRITE_ENABLE_OPCODE];
		self.standby_pulse();
		let mut bus = self.grant();
		bus.start_header();
		bus.send_bytes(&command, true)
	}

	fn disable_write(&mut self, device: u8) -> crate::AResult<()> {
		let command = [device, WRITE_DISABLE_OPCODE];
		self.standby_pulse();
		let mut bus = self.grant();
		bus.start_header();
		bus.send_bytes(&command, true)
	}

	fn read_status(&mut self, device: u8) -> crate::AResult<u8> {
		let command = [device, READ_STATUS_OPCODE];
		self.standby_pulse();
		let mut bus = self.grant();
		bus.start_header();
		bus.send_bytes(&command, false)?;
		let mut status = [0u8];
		bus.receive_bytes(&mut status)?;
		Ok(status[0])
	}

	fn write_status(&mut self, device: u8, status: u8) -> crate::AResult<()> {
		let command = [device, WRITE_STATUS_OPCODE, status];
		self.standby_pulse();
		let mut bus = self.grant();
		bus.start_header();
		bus.send_bytes(&command, true)
	}

	/// Poll the status register until the WIP bit clears.
	///
	/// Issuing RDSR commands back-to-back isn't the most efficient way
	/// to watch this bit (we could keep reading status bytes with MAK
	/// inside one command), but it is nowhere near performance-critical
	/// next to the write cycle itself. Each poll is its own short
	/// critical section with an interrupt window in between, so
	/// periodic background work is not starved across the wait.
	fn await_write_complete(&mut self, device: u8) -> crate::AResult<()> {
		let command = [device, READ_STATUS_OPCODE];
		self.standby_pulse();
		for poll in 0..MAX_STATUS_POLLS {
			self.inter_command_gap();
			let mut status = [0u8];
			{
				let mut bus = self.grant();
				bus.start_header();
				bus.send_bytes(&command, false)?;
				bus.receive_bytes(&mut status)?;
			}
			if 0 == status[0] & STATUS_WIP {
				trace!("write complete after {} status polls", poll + 1);
				return Ok(());
			}
		}
		bail!("device still busy after {} status polls", MAX_STATUS_POLLS);
	}

	/// Write `data` at any address and length, split into page-aligned
	/// chunks, each enabled, written and awaited on its own. There is
	/// no rollback: chunks already committed stay committed if a later
	/// chunk fails.
	fn simple_write(&mut self, device: u8, address: u16, data: &[u8]) -> crate::AResult<()> {
		let mut address = address;
		let mut data = data;
		while !data.is_empty() {
			let room = PAGE_SIZE - (address as usize % PAGE_SIZE);
			let chunk = data.len().min(room);
			debug!("page write of {} bytes at 0x{:04x}", chunk, address);
			self.enable_write(device)?;
			self.start_write(device, address, &data[..chunk])?;
			self.await_write_complete(device)?;
			address = address.wrapping_add(chunk as u16);
			data = &data[chunk..];
		}
		Ok(())
	}
}

impl<H: Hardware + ?Sized> EepromOperations for H {
}

#[cfg(test)]
mod tests {
	use super::EepromOperations;
	use crate::sim::SimBus;
	use crate::unio::consts::EEPROM_ADDRESS;

	#[test]
	fn page_boundary_rejected_before_any_bus_activity() {
		let mut bus = SimBus::new(256);
		// 0x0d + 4 bytes would end at 0x11, crossing the 0x10 boundary
		assert!(bus.start_write(EEPROM_ADDRESS, 0x000d, &[0u8; 4]).is_err());
		assert_eq!(0, bus.bus_ops());
	}

	#[test]
	fn full_page_at_boundary_is_accepted() {
		let mut bus = SimBus::new(256);
		bus.init();
		bus.enable_write(EEPROM_ADDRESS).unwrap();
		bus.start_write(EEPROM_ADDRESS, 0x0010, &[0u8; 16]).unwrap();
		bus.await_write_complete(EEPROM_ADDRESS).unwrap();
		assert_eq!(vec![(0x0010_u16, 16_usize)], bus.slave.write_log);
	}
}
