// 16 8-bit data registers named V0 to VF
// I -> address register (12 bits)
//
// Delay timer & Sound timer: count down at 60 times / s until 0
// Beep when the sound timer runs out
//
// Display res: 64 width, 32 height
//
// 35 opcodes, each are 2 bytes (big-endian)
//      NNN: address
//      KK: 8-bit constant
//      N: 4-bit constant
//      X and Y: 4-bit register identifier

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use std::{fs, process};

use clap::{arg, command, value_parser};
use minifb::{Key, Scale, Window, WindowOptions};

use chipvm::display::{HEIGHT, WIDTH};
use chipvm::emulator::Emulator;
use chipvm::keyboard::KEYMAP;
use chipvm::sound::Sound;
use chipvm::LoadError;

// Separately:
// CPU: ~700 instructions per second
// Display: 60 times per second
// Timers: 60 times per second
const INSTRUCTIONS_PER_FRAME: usize = 12;

// frames the tone keeps sounding after the sound timer expires
const BEEP_FRAMES: u32 = 8;

const PIXEL_ON: u32 = 0x007FFF;
const PIXEL_OFF: u32 = 0x000000;

fn main() {
    env_logger::init();

    let matches = command!()
        .arg(
            arg!([rom] "Path to the rom image to run")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();
    let rom_path = matches.get_one::<PathBuf>("rom").expect("rom is required");

    if let Err(err) = run(rom_path) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(rom_path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let rom = fs::read(rom_path).map_err(LoadError::Io)?;
    let mut emu = Emulator::new();
    emu.load_program(&rom)?;

    let mut window = Window::new(
        "chipvm - ESC to exit",
        WIDTH,
        HEIGHT,
        WindowOptions {
            scale: Scale::X16,
            ..WindowOptions::default()
        },
    )?;
    // Limit to max ~60 fps update rate; this paces the timer ticks as well
    window.limit_update_rate(Some(Duration::from_micros(16600)));

    let sound = Sound::new();
    let mut pixel_buffer = vec![PIXEL_OFF; WIDTH * HEIGHT];
    let mut beep_frames = 0u32;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        for (host_key, pad) in KEYMAP {
            emu.set_key_state(pad, window.is_key_down(host_key));
        }

        for _ in 0..INSTRUCTIONS_PER_FRAME {
            emu.step()?;
        }
        emu.tick_timers();

        if let Some(sound) = &sound {
            if emu.is_sound_pending() {
                sound.beep();
                beep_frames = BEEP_FRAMES;
            } else if beep_frames > 0 {
                beep_frames -= 1;
                if beep_frames == 0 {
                    sound.silence();
                }
            }
        }

        if emu.consume_redraw_flag() {
            let cells = emu.framebuffer().pixels();
            for (cell, pixel) in cells.iter().zip(pixel_buffer.iter_mut()) {
                *pixel = if *cell == 1 { PIXEL_ON } else { PIXEL_OFF };
            }
        }
        window.update_with_buffer(&pixel_buffer, WIDTH, HEIGHT)?;
    }

    Ok(())
}
