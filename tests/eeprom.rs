extern crate unio_eeprom;

use unio_eeprom::sim::SimBus;
use unio_eeprom::unio::consts::{
	EEPROM_ADDRESS,
	PAGE_SIZE,
	STATUS_WEL,
};
use unio_eeprom::unio::{
	EepromOperations,
	Hardware,
	LineDirection,
};

fn fresh_bus() -> SimBus {
	let mut bus = SimBus::new(256);
	bus.init();
	bus
}

#[test]
fn round_trip_at_offset() {
	let mut bus = fresh_bus();
	bus.simple_write(EEPROM_ADDRESS, 0x0003, &[0xde, 0xad, 0xbe, 0xef])
		.unwrap();
	let mut readback = [0u8; 4];
	bus.read(EEPROM_ADDRESS, 0x0003, &mut readback).unwrap();
	assert_eq!([0xde, 0xad, 0xbe, 0xef], readback);
	// neighbours untouched
	let mut edges = [0u8; 1];
	bus.read(EEPROM_ADDRESS, 0x0002, &mut edges).unwrap();
	assert_eq!([0xff], edges);
	bus.read(EEPROM_ADDRESS, 0x0007, &mut edges).unwrap();
	assert_eq!([0xff], edges);
}

#[test]
fn unaligned_write_splits_at_page_boundary() {
	let mut bus = fresh_bus();
	bus.simple_write(EEPROM_ADDRESS, 0x001e, &[0xfe, 0xed, 0xba, 0xbe])
		.unwrap();
	assert_eq!(vec![(0x001e_u16, 2_usize), (0x0020, 2)], bus.slave.write_log);
	let mut readback = [0u8; 4];
	bus.read(EEPROM_ADDRESS, 0x001e, &mut readback).unwrap();
	assert_eq!([0xfe, 0xed, 0xba, 0xbe], readback);
}

#[test]
fn chunks_cover_span_without_crossing_pages() {
	let mut bus = fresh_bus();
	let data: Vec<u8> = (0..37).collect();
	bus.simple_write(EEPROM_ADDRESS, 0x000d, &data).unwrap();

	let log = bus.slave.write_log.clone();
	assert_eq!(
		vec![(0x000d_u16, 3_usize), (0x0010, 16), (0x0020, 16), (0x0030, 2)],
		log
	);
	// union covers [0x0d, 0x32) exactly, no chunk crosses a boundary
	let mut next = 0x000du16;
	for &(start, len) in log.iter() {
		assert_eq!(next, start);
		let first_page = start as usize / PAGE_SIZE;
		let last_page = (start as usize + len - 1) / PAGE_SIZE;
		assert_eq!(first_page, last_page);
		next = start + len as u16;
	}
	assert_eq!(0x0032, next);

	let mut readback = vec![0u8; 37];
	bus.read(EEPROM_ADDRESS, 0x000d, &mut readback).unwrap();
	assert_eq!(data, readback);
}

#[test]
fn boundary_violation_rejected_without_bus_activity() {
	let mut bus = SimBus::new(256);
	assert!(bus.start_write(EEPROM_ADDRESS, 0x000d, &[0u8; 4]).is_err());
	assert_eq!(0, bus.bus_ops());
	assert_eq!(0, bus.irq_suspends());
	assert!(bus.slave.memory.iter().all(|b| *b == 0xff));
}

#[test]
fn missing_ack_stops_the_payload() {
	let mut bus = fresh_bus();
	bus.slave.fail_payload_at = Some(2);
	bus.enable_write(EEPROM_ADDRESS).unwrap();
	let result = bus.start_write(EEPROM_ADDRESS, 0x0000, &[0x11; 8]);
	assert!(result.is_err());
	// bytes 0 and 1 were accepted, nothing after the refused byte 2
	assert_eq!(2, bus.slave.payload_seen);
	// nothing was committed
	assert!(bus.slave.write_log.is_empty());
	assert!(bus.slave.memory.iter().all(|b| *b == 0xff));
	// the critical section was released on the failure path
	assert_eq!(0, bus.irq_depth());
}

#[test]
fn busy_device_is_polled_until_wip_clears() {
	let mut bus = fresh_bus();
	bus.slave.busy_polls = 3;
	bus.enable_write(EEPROM_ADDRESS).unwrap();
	bus.start_write(EEPROM_ADDRESS, 0x0000, &[0x42; 4]).unwrap();
	bus.await_write_complete(EEPROM_ADDRESS).unwrap();
	// three polls report WIP, the fourth reports idle
	assert_eq!(4, bus.slave.status_reads);
}

#[test]
fn write_enable_latch_tracks_wren_and_wrdi() {
	let mut bus = fresh_bus();
	assert_eq!(0, bus.read_status(EEPROM_ADDRESS).unwrap() & STATUS_WEL);
	bus.enable_write(EEPROM_ADDRESS).unwrap();
	assert!(bus.slave.write_enabled());
	assert_ne!(0, bus.read_status(EEPROM_ADDRESS).unwrap() & STATUS_WEL);
	bus.disable_write(EEPROM_ADDRESS).unwrap();
	assert_eq!(0, bus.read_status(EEPROM_ADDRESS).unwrap() & STATUS_WEL);
}

#[test]
fn write_without_enable_is_ignored() {
	let mut bus = fresh_bus();
	bus.start_write(EEPROM_ADDRESS, 0x0000, &[0x42; 4]).unwrap();
	bus.await_write_complete(EEPROM_ADDRESS).unwrap();
	assert!(bus.slave.write_log.is_empty());
	assert!(bus.slave.memory.iter().all(|b| *b == 0xff));
}

#[test]
fn wrong_device_address_gets_no_acknowledge() {
	let mut bus = fresh_bus();
	let mut readback = [0u8; 1];
	assert!(bus.read(0xa1, 0x0000, &mut readback).is_err());
	assert!(bus.enable_write(0xa1).is_err());
	// a later command to the right address still works
	bus.read(EEPROM_ADDRESS, 0x0000, &mut readback).unwrap();
	assert_eq!([0xff], readback);
}

#[test]
fn status_write_updates_block_protection() {
	let mut bus = fresh_bus();
	bus.write_status(EEPROM_ADDRESS, 0x0c).unwrap();
	let status = bus.read_status(EEPROM_ADDRESS).unwrap();
	assert_eq!(0x0c, status & 0x0c);
}

#[test]
fn critical_sections_balance_over_mixed_outcomes() {
	let mut bus = fresh_bus();
	bus.slave.busy_polls = 1;
	bus.simple_write(EEPROM_ADDRESS, 0x001e, &[1, 2, 3, 4]).unwrap();
	bus.slave.fail_payload_at = Some(0);
	bus.enable_write(EEPROM_ADDRESS).unwrap();
	assert!(bus.start_write(EEPROM_ADDRESS, 0x0040, &[9; 4]).is_err());
	assert_eq!(0, bus.irq_depth());
	assert!(bus.irq_suspends() > 0);
}

#[test]
fn sim_bus_answers_through_the_exported_hardware_trait() {
	let mut bus = SimBus::new(16);
	bus.set_direction(LineDirection::Drive);
	bus.set_line(true);
	assert!(bus.read_line());
	bus.set_line(false);
	assert!(!bus.read_line());
	// released with no slave driving, the pull-up wins
	bus.set_direction(LineDirection::Release);
	assert!(bus.read_line());
}

#[test]
fn degenerate_memory_size_still_answers_reads() {
	let mut bus = SimBus::new(0);
	bus.init();
	let mut readback = [0u8; 1];
	bus.read(EEPROM_ADDRESS, 0x0000, &mut readback).unwrap();
	assert_eq!([0xff], readback);
}

#[test]
fn overwrite_replaces_previous_content() {
	let mut bus = fresh_bus();
	let counting: Vec<u8> = (0..51).collect();
	bus.simple_write(EEPROM_ADDRESS, 0x0003, &[0xde, 0xad, 0xbe, 0xef])
		.unwrap();
	bus.simple_write(EEPROM_ADDRESS, 0x0000, &counting).unwrap();
	let mut readback = vec![0u8; 51];
	bus.read(EEPROM_ADDRESS, 0x0000, &mut readback).unwrap();
	assert_eq!(counting, readback);
}
