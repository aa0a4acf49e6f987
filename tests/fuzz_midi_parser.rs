//! Fuzzing tests for the text and byte parsers
//!
//! Feeds random and malformed input to the MIDI decoder and to the note and
//! bar-time parsers to make sure they reject garbage without panicking.

use block_timeline::midi::event::MidiEvent;
use block_timeline::sequencer::{BarTime, NoteValue, Pitch};
use rand::Rng;

/// Fuzz the MIDI decoder with random byte sequences
#[test]
fn fuzz_midi_parser_random_bytes() {
    let mut rng = rand::thread_rng();

    for _ in 0..1000 {
        let length = rng.gen_range(0..=8);
        let random_bytes: Vec<u8> = (0..length).map(|_| rng.gen_range(0..=255)).collect();

        // Only note messages decode
        if let Some(event) = MidiEvent::from_bytes(&random_bytes) {
            assert!(matches!(random_bytes[0] & 0xF0, 0x80 | 0x90));
            assert_eq!(event.note(), random_bytes[1]);
        }
    }
}

/// Events produced by voices survive the byte encoding
#[test]
fn fuzz_midi_encode_decode() {
    let mut rng = rand::thread_rng();

    for _ in 0..500 {
        let note = rng.gen_range(0..=127);
        let channel = rng.gen_range(0..=15);
        let event = if rng.gen_bool(0.5) {
            MidiEvent::NoteOn {
                note,
                velocity: rng.gen_range(1..=127),
            }
        } else {
            MidiEvent::NoteOff { note }
        };

        let bytes = event.to_bytes(channel);
        assert_eq!(bytes[0] & 0x0F, channel);
        assert_eq!(MidiEvent::from_bytes(&bytes), Some(event));
    }
}

/// Random strings never panic the text parsers
#[test]
fn fuzz_text_parsers() {
    let mut rng = rand::thread_rng();
    let alphabet: Vec<char> = "ABCDEFGHabn#-:0123456789 ".chars().collect();

    for _ in 0..2000 {
        let length = rng.gen_range(0..=8);
        let text: String = (0..length)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
            .collect();

        if let Ok(pitch) = text.parse::<Pitch>() {
            assert!(pitch.midi() <= 127);
        }
        if let Ok(value) = text.parse::<NoteValue>() {
            assert_eq!(value.to_string(), text.trim());
        }
        if let Ok(time) = text.parse::<BarTime>() {
            assert_eq!(time.to_string().parse::<BarTime>(), Ok(time));
        }
    }
}
