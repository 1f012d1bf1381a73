use std::{thread, time::Duration};

use chip8::{constants::*, prelude::*};

#[rustfmt::skip]
const MAZE: &[u8] = &[
    0xA2, 0x1E, 0xC2, 0x01, 0x32, 0x01, 0xA2, 0x1A,
    0xD0, 0x14, 0x70, 0x04, 0x30, 0x40, 0x12, 0x00,
    0x60, 0x00, 0x71, 0x04, 0x31, 0x20, 0x12, 0x00,
    0x12, 0x18, 0x80, 0x40, 0x20, 0x10, 0x20, 0x40,
    0x80, 0x10,
];

/// Instructions needed for the maze to fill the screen.
const MAZE_STEPS: usize = 16 * 8 * 7 + 8 * 4;

fn maze_vm(seed: u64) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf {
        rng_seed: Some(seed),
        ..Default::default()
    });
    vm.load_bytecode(MAZE).unwrap();
    vm
}

#[test]
fn test_maze_settles() {
    let mut vm = maze_vm(1);
    vm.run_steps(MAZE_STEPS * 2).unwrap();

    // parked in the final loop
    assert_eq!(vm.pc(), 0x218);
    assert_eq!(vm.run_steps(10).unwrap(), Flow::Jump);
    assert_eq!(vm.pc(), 0x218);

    // every 4x4 cell holds a diagonal with 4 lit pixels
    let lit = vm.display_buffer().iter().filter(|px| **px).count();
    assert_eq!(lit, DISPLAY_BUFFER_SIZE / 4);
}

#[test]
fn test_maze_deterministic() {
    let mut a = maze_vm(7);
    let mut b = maze_vm(7);
    a.run_steps(MAZE_STEPS * 2).unwrap();
    b.run_steps(MAZE_STEPS * 2).unwrap();

    assert_eq!(a.display_buffer()[..], b.display_buffer()[..]);
}

#[test]
fn test_frames_sent_to_presenter() {
    let (sender, frames) = FrameSender::channel();
    let mut vm = Chip8Vm::new(Chip8Conf::default()).with_screen(sender);

    #[rustfmt::skip]
    vm.load_bytecode(&[
        0x60, 0x0F, // LD V0, F
        0xF0, 0x29, // LD F, V0
        0xD1, 0x15, // DRW V1, V1, 5
    ]).unwrap();
    vm.run_steps(3).unwrap();

    let frame = frames.try_recv().unwrap();
    assert_eq!(frame[..], vm.display_buffer()[..]);
    assert!(frames.try_recv().is_none());
}

#[test]
fn test_presenter_ends_on_latest_frame() {
    let (sender, frames) = FrameSender::channel();
    let mut vm = Chip8Vm::new(Chip8Conf::default()).with_screen(sender);

    #[rustfmt::skip]
    vm.load_bytecode(&[
        0xA0, 0x00, // 200: LD I, 0   ; glyph "0"
        0xD0, 0x05, // 202: DRW V0, V0, 5
        0x60, 0x10, // 204: LD V0, 16
        0xD0, 0x05, // 206: DRW V0, V0, 5
        0x12, 0x08, // 208: JP 208
    ]).unwrap();
    vm.run_steps(10).unwrap();

    // presenter was too slow for the first frame
    let frame = frames.try_recv().unwrap();
    let lit = frame.iter().filter(|px| **px).count();
    assert_eq!(lit, 28);
    assert_eq!(frame[..], vm.display_buffer()[..]);
    assert!(frames.try_recv().is_none());
}

#[test]
fn test_presenter_never_blocks() {
    let (sender, frames) = FrameSender::channel();
    let mut vm = Chip8Vm::new(Chip8Conf::default()).with_screen(sender);

    // CLS in a loop, nobody reading frames
    vm.load_bytecode(&[0x00, 0xE0, 0x12, 0x00]).unwrap();
    vm.run_steps(100).unwrap();

    assert!(frames.try_recv().is_some());
    assert!(frames.try_recv().is_none());
}

#[test]
fn test_interrupt_from_thread() {
    let keypad = Keypad::new();
    let mut vm = Chip8Vm::new(Chip8Conf {
        clock_frequency: Some(Hz(1000)),
        ..Default::default()
    })
    .with_keyboard(keypad.clone());

    #[rustfmt::skip]
    vm.load_bytecode(&[
        0xF3, 0x0A, // 200: LD V3, K
        0x12, 0x02, // 202: JP 202
    ]).unwrap();

    let interrupt = vm.interrupt_handle();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        keypad.press(KeyCode::KeyC);
        thread::sleep(Duration::from_millis(20));
        keypad.release(KeyCode::KeyC);
        thread::sleep(Duration::from_millis(50));
        interrupt.trigger();
    });

    assert_eq!(vm.execute().unwrap(), Flow::Interrupt);
    handle.join().unwrap();

    assert_eq!(vm.register(3), 0xC);
    assert_eq!(vm.pc(), 0x202);
}

#[test]
fn test_rom_file() {
    let path = std::env::temp_dir().join(format!("chip8-maze-{}.ch8", std::process::id()));
    std::fs::write(&path, MAZE).unwrap();

    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(vm.pc(), MEM_START as Address);
    assert_eq!(vm.cpu().ram().get(MEM_START), 0xA2);
}

#[test]
fn test_missing_rom() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    let err = vm.load_rom("does/not/exist.ch8").unwrap_err();
    assert!(matches!(err, Chip8Error::Io(_)));
}
