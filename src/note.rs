//! Frequency-to-note mapping and the note color palette.
//!
//! Standard 12-tone equal temperament referenced to A4 = 440 Hz. Each of the
//! twelve pitch classes owns one fixed palette color, shared between leaf
//! generation and drawing.

use std::fmt;

/// The twelve chromatic pitch classes, starting at C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteName {
    C,
    Db,
    D,
    Eb,
    E,
    F,
    Gb,
    G,
    Ab,
    A,
    Bb,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::Db,
        NoteName::D,
        NoteName::Eb,
        NoteName::E,
        NoteName::F,
        NoteName::Gb,
        NoteName::G,
        NoteName::Ab,
        NoteName::A,
        NoteName::Bb,
        NoteName::B,
    ];

    /// Pitch class for a semitone index counted from C (0..12).
    pub fn from_index(index: usize) -> NoteName {
        Self::ALL[index % 12]
    }

    /// The palette color owned by this pitch class.
    pub fn palette(self) -> PaletteColor {
        match self {
            NoteName::C => PaletteColor::Yellow,
            NoteName::Db => PaletteColor::Orange,
            NoteName::D => PaletteColor::Pink,
            NoteName::Eb => PaletteColor::Red,
            NoteName::E => PaletteColor::Green,
            NoteName::F => PaletteColor::DarkGreen,
            NoteName::Gb => PaletteColor::Blue,
            NoteName::G => PaletteColor::DarkBlue,
            NoteName::Ab => PaletteColor::Purple,
            NoteName::A => PaletteColor::Ash,
            NoteName::Bb => PaletteColor::Brown,
            NoteName::B => PaletteColor::Black,
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoteName::C => "C",
            NoteName::Db => "Db",
            NoteName::D => "D",
            NoteName::Eb => "Eb",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::Gb => "Gb",
            NoteName::G => "G",
            NoteName::Ab => "Ab",
            NoteName::A => "A",
            NoteName::Bb => "Bb",
            NoteName::B => "B",
        };
        f.write_str(s)
    }
}

/// A musical note: pitch class plus octave number (scientific pitch notation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub name: NoteName,
    pub octave: i32,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// Map a frequency to the nearest equal-temperament note.
///
/// Returns `None` for non-positive or non-finite input. Ties at exact
/// half-semitone boundaries round away from zero (`f32::round`).
pub fn frequency_to_note(freq: f32) -> Option<Note> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }

    let semitones_from_a4 = (12.0 * (freq / 440.0).log2()).round() as i32;

    // Rebase to C4 so the index and octave fall out of one division.
    let semitones_from_c4 = semitones_from_a4 + 9;
    let index = semitones_from_c4.rem_euclid(12) as usize;
    let octave = 4 + semitones_from_c4.div_euclid(12);

    Some(Note {
        name: NoteName::from_index(index),
        octave,
    })
}

/// The fixed 12-entry color palette, one entry per pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteColor {
    Yellow,
    Orange,
    Pink,
    Red,
    Green,
    DarkGreen,
    Blue,
    DarkBlue,
    Purple,
    Ash,
    Brown,
    Black,
}

impl PaletteColor {
    /// 8-bit RGB triple, shared by the palette and the drawing routines.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            PaletteColor::Yellow => [245, 205, 48],
            PaletteColor::Orange => [240, 138, 30],
            PaletteColor::Pink => [238, 114, 178],
            PaletteColor::Red => [211, 47, 47],
            PaletteColor::Green => [88, 176, 72],
            PaletteColor::DarkGreen => [27, 94, 32],
            PaletteColor::Blue => [66, 135, 245],
            PaletteColor::DarkBlue => [26, 35, 126],
            PaletteColor::Purple => [123, 31, 162],
            PaletteColor::Ash => [158, 158, 158],
            PaletteColor::Brown => [121, 85, 61],
            PaletteColor::Black => [33, 33, 33],
        }
    }
}

impl fmt::Display for PaletteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaletteColor::Yellow => "yellow",
            PaletteColor::Orange => "orange",
            PaletteColor::Pink => "pink",
            PaletteColor::Red => "red",
            PaletteColor::Green => "green",
            PaletteColor::DarkGreen => "darkgreen",
            PaletteColor::Blue => "blue",
            PaletteColor::DarkBlue => "darkblue",
            PaletteColor::Purple => "purple",
            PaletteColor::Ash => "ash",
            PaletteColor::Brown => "brown",
            PaletteColor::Black => "black",
        };
        f.write_str(s)
    }
}
